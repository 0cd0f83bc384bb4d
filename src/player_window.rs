//! Player surface: video texture, transport bar, status line and channel overlay

use eframe::egui;
use std::time::Duration;

use crate::config::AppConfig;
use crate::engine::{FfmpegMedia, NetEngines};
use crate::epg::{self, Program};
use crate::models::{StreamDescriptor, StreamId};
use crate::player::{
    format_time, BackendKind, FormatResolver, InputAction, InputMapper, MediaElement, PlayerKey,
    SessionController, SessionState, StatusKind, SurfaceRequest, TransportCommand, XtreamOrigin,
    PLAYBACK_RATES,
};

/// Seek buttons on the transport bar
const BUTTON_SEEK_STEP: f64 = 10.0;
const PIP_SIZE: [f32; 2] = [480.0, 290.0];

const KEY_TABLE: [(egui::Key, PlayerKey); 12] = [
    (egui::Key::Space, PlayerKey::Space),
    (egui::Key::K, PlayerKey::K),
    (egui::Key::ArrowLeft, PlayerKey::ArrowLeft),
    (egui::Key::ArrowRight, PlayerKey::ArrowRight),
    (egui::Key::ArrowUp, PlayerKey::ArrowUp),
    (egui::Key::ArrowDown, PlayerKey::ArrowDown),
    (egui::Key::M, PlayerKey::M),
    (egui::Key::F, PlayerKey::F),
    (egui::Key::P, PlayerKey::P),
    (egui::Key::C, PlayerKey::C),
    (egui::Key::PageUp, PlayerKey::PageUp),
    (egui::Key::PageDown, PlayerKey::PageDown),
];

fn backend_label(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::NativeHls => "HLS (native)",
        BackendKind::ManagedHls => "HLS",
        BackendKind::ManagedDash => "DASH",
        BackendKind::Progressive => "Direct",
    }
}

/// Player window that can be embedded in egui
pub struct PlayerWindow {
    session: SessionController<FfmpegMedia>,
    input: InputMapper,
    texture: Option<egui::TextureHandle>,
    pub show_controls: bool,
    /// Streams reachable by channel up/down, in list order
    channels: Vec<StreamDescriptor>,
    channel_index: Option<usize>,
    overlay_selection: usize,
    last_state: SessionState,
    restore_size: Option<egui::Vec2>,
    log: Vec<String>,
    /// Programmes of the live channel being played
    epg: Vec<Program>,
    /// Live channel whose EPG the app should fetch
    epg_request: Option<StreamId>,
}

impl PlayerWindow {
    pub fn new(config: &AppConfig) -> Self {
        let user_agent = config.user_agent();
        let mut media = FfmpegMedia::new(config.decoder_options());
        if config.start_muted {
            media.set_muted(true);
        }
        let engines = NetEngines::new(&user_agent, FfmpegMedia::decoding_available());
        let resolver = FormatResolver::new(None).with_containers(config.containers());

        Self {
            session: SessionController::new(media, Box::new(engines), resolver, config.to_session_config()),
            input: InputMapper::new(),
            texture: None,
            show_controls: true,
            channels: Vec::new(),
            channel_index: None,
            overlay_selection: 0,
            last_state: SessionState::Idle,
            restore_size: None,
            log: Vec::new(),
            epg: Vec::new(),
            epg_request: None,
        }
    }

    /// Re-read settings; takes effect from the next stream
    pub fn apply_config(&mut self, config: &AppConfig) {
        self.session.set_config(config.to_session_config());
        self.session.media_mut().set_options(config.decoder_options());
        let resolver = std::mem::take(self.session.resolver_mut());
        *self.session.resolver_mut() = resolver.with_containers(config.containers());
    }

    pub fn set_origin(&mut self, origin: Option<XtreamOrigin>) {
        self.session.resolver_mut().set_origin(origin);
    }

    /// Play `stream`; `channels` becomes the zapping list
    pub fn play(&mut self, stream: StreamDescriptor, channels: Vec<StreamDescriptor>) {
        self.channel_index = channels.iter().position(|c| c.id == stream.id);
        self.channels = channels;
        self.overlay_selection = self.channel_index.unwrap_or(0);
        self.texture = None;
        self.log.push(format!("[PLAY] {}", stream.name));
        self.request_epg(&stream);
        self.session.load(stream);
        self.input.mount();
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.session.stop();
        self.texture = None;
        self.epg.clear();
        self.epg_request = None;
        self.input.unmount();
        self.leave_surface_modes();
    }

    /// Console lines produced since the last call
    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    fn zap(&mut self, forward: bool) {
        if self.channels.is_empty() {
            return;
        }
        let len = self.channels.len();
        let next = match (self.channel_index, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, _) => 0,
        };
        self.switch_channel(next);
    }

    fn switch_channel(&mut self, index: usize) {
        let Some(stream) = self.channels.get(index).cloned() else {
            return;
        };
        self.channel_index = Some(index);
        self.overlay_selection = index;
        self.texture = None;
        self.log.push(format!("[PLAY] {}", stream.name));
        self.request_epg(&stream);
        self.session.load(stream);
    }

    fn request_epg(&mut self, stream: &StreamDescriptor) {
        self.epg.clear();
        self.epg_request = stream.is_live().then(|| stream.id.clone());
    }

    /// Live channel whose short EPG should be fetched, once per channel change
    pub fn take_epg_request(&mut self) -> Option<StreamId> {
        self.epg_request.take()
    }

    /// Programmes for `stream_id`; ignored if another stream is playing by now
    pub fn set_epg(&mut self, stream_id: &StreamId, programs: Vec<Program>) {
        if self.session.stream().map(|s| &s.id) == Some(stream_id) {
            self.epg = programs;
        }
    }

    fn leave_surface_modes(&mut self) {
        if self.session.is_fullscreen() {
            self.session.toggle_fullscreen();
        }
        if self.session.is_picture_in_picture() {
            self.session.toggle_picture_in_picture();
        }
    }

    fn log_transition(&mut self) {
        let state = self.session.state().clone();
        if state == self.last_state {
            return;
        }
        match &state {
            SessionState::Playing { .. } => {
                if let (Some(candidate), Some(kind)) = (self.session.current_candidate(), self.session.backend_kind()) {
                    self.log.push(format!("[PLAY] Playing {} via {}: {}", candidate.format, backend_label(kind), candidate.url));
                }
            }
            SessionState::Failed { reason } => {
                self.log.push(format!("[ERROR] Playback failed: {}", reason));
            }
            SessionState::Attaching { candidate } if *candidate > 0 => {
                if let Some(c) = self.session.current_candidate() {
                    self.log.push(format!("[WARN] Trying {} source {}", c.format, c.url));
                }
            }
            _ => {}
        }
        self.last_state = state;
    }

    fn apply_surface_requests(&mut self, ctx: &egui::Context) {
        for request in self.session.take_surface_requests() {
            match request {
                SurfaceRequest::EnterFullscreen => {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(true));
                }
                SurfaceRequest::ExitFullscreen => {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
                }
                SurfaceRequest::EnterPictureInPicture => {
                    self.restore_size = ctx.input(|i| i.viewport().inner_rect.map(|r| r.size()));
                    self.show_controls = false;
                    ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(
                        egui::viewport::WindowLevel::AlwaysOnTop,
                    ));
                    ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(PIP_SIZE.into()));
                }
                SurfaceRequest::ExitPictureInPicture => {
                    self.show_controls = true;
                    ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(
                        egui::viewport::WindowLevel::Normal,
                    ));
                    if let Some(size) = self.restore_size.take() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
                    }
                }
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if !self.input.is_mounted() || ctx.wants_keyboard_input() {
            return;
        }

        if self.input.overlay_active() {
            let (up, down, enter, close) = ctx.input(|i| {
                (
                    i.key_pressed(egui::Key::ArrowUp),
                    i.key_pressed(egui::Key::ArrowDown),
                    i.key_pressed(egui::Key::Enter),
                    i.key_pressed(egui::Key::Escape) || i.key_pressed(egui::Key::C),
                )
            });
            if !self.channels.is_empty() {
                if up {
                    self.overlay_selection = self.overlay_selection.saturating_sub(1);
                }
                if down {
                    self.overlay_selection = (self.overlay_selection + 1).min(self.channels.len() - 1);
                }
                if enter {
                    self.switch_channel(self.overlay_selection);
                    self.input.set_overlay_active(false);
                }
            }
            if close {
                self.input.set_overlay_active(false);
            }
            return;
        }

        let pressed: Vec<PlayerKey> = ctx.input(|i| {
            KEY_TABLE
                .iter()
                .filter(|(key, _)| i.key_pressed(*key))
                .map(|(_, player_key)| *player_key)
                .collect()
        });
        for key in pressed {
            match self.input.map(key) {
                Some(InputAction::Transport(command)) => self.session.execute(command),
                Some(InputAction::NextChannel) => self.zap(true),
                Some(InputAction::PreviousChannel) => self.zap(false),
                Some(InputAction::ShowOverlay) => {
                    self.overlay_selection = self.channel_index.unwrap_or(0);
                    self.input.set_overlay_active(true);
                }
                None => {}
            }
        }
    }

    /// Render the player UI
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        self.session.media_mut().pump();
        self.session.poll();
        self.log_transition();
        self.handle_keys(ctx);
        self.apply_surface_requests(ctx);

        if !self.session.is_active() {
            self.show_controls = true;
            ui.centered_and_justified(|ui| {
                ui.label("Select a channel or title to start playback");
            });
            return;
        }

        // Check for new frames
        if let Some(frame) = self.session.media().take_frame() {
            let image = egui::ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);
            match self.texture.as_mut() {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
                }
            }
        }

        let state = self.session.ui().clone();
        let session_state = self.session.state().clone();
        let mut commands: Vec<TransportCommand> = Vec::new();
        let mut retry = false;
        let mut stop = false;

        let controls_height = if self.show_controls { 90.0 } else { 0.0 };
        let video_size = ui.available_size() - egui::vec2(0.0, controls_height);

        ui.allocate_ui(video_size, |ui| {
            ui.vertical_centered(|ui| {
                if let Some(ref texture) = self.texture {
                    let tex_size = texture.size_vec2();
                    let aspect = tex_size.x / tex_size.y.max(1.0);
                    let (width, height) = if video_size.x / video_size.y.max(1.0) > aspect {
                        (video_size.y * aspect, video_size.y)
                    } else {
                        (video_size.x, video_size.x / aspect)
                    };
                    ui.image((texture.id(), egui::vec2(width, height)));
                } else {
                    ui.add_space(50.0);
                    match &session_state {
                        SessionState::Resolving | SessionState::Attaching { .. } => {
                            ui.spinner();
                            ui.label("Connecting to stream...");
                        }
                        SessionState::Idle | SessionState::Playing { .. } => {
                            ui.spinner();
                        }
                        SessionState::Failed { reason } => {
                            ui.colored_label(egui::Color32::RED, format!("Error: {}", reason));
                            if ui.button("⟳ Retry").clicked() {
                                retry = true;
                            }
                        }
                    }
                }
            });
        });

        if self.input.overlay_active() {
            self.show_channel_overlay(ctx);
        }

        if let Some(status) = &state.status {
            let color = match status.kind {
                StatusKind::Transient => egui::Color32::YELLOW,
                StatusKind::Terminal => egui::Color32::RED,
            };
            ui.colored_label(color, format!("⚠ {}", status.message));
        }
        // Controls
        if self.show_controls {
            self.show_now_next(ui);
            ui.separator();
            self.show_seek_bar(ui, &state, &mut commands);
            ui.horizontal(|ui| {
                let play_text = if state.is_playing { "⏸" } else { "▶" };
                if ui.button(play_text).on_hover_text("Play/Pause (Space)").clicked() {
                    commands.push(TransportCommand::TogglePlay);
                }
                if ui.button("⏹").on_hover_text("Stop").clicked() {
                    stop = true;
                }
                if !state.is_live() {
                    if ui.button("⏪ 10s").clicked() {
                        commands.push(TransportCommand::SeekBy(-BUTTON_SEEK_STEP));
                    }
                    if ui.button("10s ⏩").clicked() {
                        commands.push(TransportCommand::SeekBy(BUTTON_SEEK_STEP));
                    }
                }

                let mute_text = if state.muted || state.volume == 0.0 { "🔇" } else { "🔊" };
                if ui.button(mute_text).on_hover_text("Mute (M)").clicked() {
                    commands.push(TransportCommand::ToggleMute);
                }
                let mut volume = state.volume;
                if ui
                    .add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false))
                    .changed()
                {
                    commands.push(TransportCommand::SetVolume(volume));
                }

                let mut rate = state.playback_rate;
                egui::ComboBox::from_id_salt("playback_rate")
                    .selected_text(format!("{}x", rate))
                    .width(60.0)
                    .show_ui(ui, |ui| {
                        for r in PLAYBACK_RATES {
                            ui.selectable_value(&mut rate, r, format!("{}x", r));
                        }
                    });
                if rate != state.playback_rate {
                    commands.push(TransportCommand::SetPlaybackRate(rate));
                }

                let mut selection = state.selected_quality;
                ui.add_enabled_ui(state.quality_control_enabled(), |ui| {
                    egui::ComboBox::from_id_salt("quality")
                        .selected_text(state.quality_label.as_str())
                        .show_ui(ui, |ui| {
                            for (label, option) in state.quality_options() {
                                ui.selectable_value(&mut selection, option, label);
                            }
                        });
                });
                if selection != state.selected_quality {
                    commands.push(TransportCommand::SelectQuality(selection));
                }

                if let Some(kind) = state.backend {
                    ui.label(egui::RichText::new(backend_label(kind)).weak());
                }
                if let Some(bitrate) = state.bitrate {
                    ui.label(egui::RichText::new(format!("{} kbps", bitrate / 1000)).weak());
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⛶").on_hover_text("Fullscreen (F)").clicked() {
                        commands.push(TransportCommand::ToggleFullscreen);
                    }
                    if ui.button("🗗").on_hover_text("Picture-in-picture (P)").clicked() {
                        commands.push(TransportCommand::TogglePictureInPicture);
                    }
                    if ui.button("☰").on_hover_text("Channels (C)").clicked() {
                        self.overlay_selection = self.channel_index.unwrap_or(0);
                        self.input.set_overlay_active(true);
                    }
                    if let Some(stream) = self.session.stream() {
                        ui.label(egui::RichText::new(&stream.name).strong());
                    }
                });
            });
        } else if ui.button("🗗 Exit picture-in-picture").clicked() {
            commands.push(TransportCommand::TogglePictureInPicture);
        }

        for command in commands {
            self.session.execute(command);
        }
        if retry {
            self.session.retry();
        }
        if stop {
            self.stop();
        }

        // Request continuous repaint while playing
        if self.session.is_active() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn show_now_next(&self, ui: &mut egui::Ui) {
        let now = chrono::Utc::now().timestamp();
        let (current, next) = epg::now_and_next(&self.epg, now);
        if current.is_none() && next.is_none() {
            return;
        }
        ui.horizontal(|ui| {
            if let Some(program) = current {
                ui.label(egui::RichText::new("Now").strong());
                let response = ui.label(format!(
                    "{}-{} {}",
                    epg::format_time(program.start),
                    epg::format_time(program.stop),
                    program.title
                ));
                if let Some(description) = &program.description {
                    response.on_hover_text(description);
                }
                ui.add(egui::ProgressBar::new(program.progress(now)).desired_width(60.0).desired_height(4.0));
                let remaining = (program.stop - now) / 60;
                if remaining > 0 {
                    ui.label(egui::RichText::new(format!("({}m left)", remaining)).small().weak());
                }
            }
            if let Some(program) = next {
                ui.separator();
                ui.label(egui::RichText::new("Next").strong());
                ui.label(format!("{} {}", epg::format_time(program.start), program.title));
            }
        });
    }

    fn show_seek_bar(
        &self,
        ui: &mut egui::Ui,
        state: &crate::player::PlaybackUiState,
        commands: &mut Vec<TransportCommand>,
    ) {
        ui.horizontal(|ui| {
            ui.label(format_time(state.current_time));
            if state.is_live() {
                ui.label(egui::RichText::new("● LIVE").color(egui::Color32::RED));
                return;
            }

            let width = (ui.available_width() - 60.0).max(100.0);
            ui.vertical(|ui| {
                let mut position = state.current_time;
                ui.spacing_mut().slider_width = width;
                let response = ui.add(
                    egui::Slider::new(&mut position, 0.0..=state.duration.max(0.0)).show_value(false),
                );
                if response.drag_stopped() || (response.changed() && !response.dragged()) {
                    commands.push(TransportCommand::SeekTo(position));
                }
                if let Some(fraction) = state.buffered_fraction() {
                    ui.add(egui::ProgressBar::new(fraction).desired_width(width).desired_height(3.0));
                }
            });
            ui.label(format_time(state.duration));
        });
    }

    fn show_channel_overlay(&mut self, ctx: &egui::Context) {
        let mut chosen: Option<usize> = None;
        let mut close = false;

        egui::Window::new("Channels")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
            .default_width(280.0)
            .show(ctx, |ui| {
                if self.channels.is_empty() {
                    ui.label("No channel list");
                }
                egui::ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                    for (i, channel) in self.channels.iter().enumerate() {
                        let current = Some(i) == self.channel_index;
                        let text = if current {
                            egui::RichText::new(format!("▶ {}", channel.name)).strong()
                        } else {
                            egui::RichText::new(&channel.name)
                        };
                        let response = ui.selectable_label(i == self.overlay_selection, text);
                        if i == self.overlay_selection {
                            response.scroll_to_me(None);
                        }
                        if response.clicked() {
                            chosen = Some(i);
                        }
                    }
                });
                if ui.button("Close").clicked() {
                    close = true;
                }
            });

        if let Some(index) = chosen {
            self.switch_channel(index);
            close = true;
        }
        if close {
            self.input.set_overlay_active(false);
        }
    }
}
