//! Playback session controller
//!
//! Owns the media element and the backend attached for the current stream,
//! and is the only place where session state changes:
//!
//! ```text
//! Idle -> Resolving -> Attaching(c) -> Playing
//!                         |   ^
//!                         v   |  (unsupported / setup failed / fatal error)
//!                      Attaching(c + 1) ... -> Failed
//! ```
//!
//! Media element events arrive over an mpsc channel stamped with the session
//! generation; backend signals are pulled from the active backend in
//! [`SessionController::poll`], which the UI calls once per frame.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::{debug, error, info, warn};

use crate::models::StreamDescriptor;

use super::backend::{
    select_backend, Backend, BackendKind, BackendSignal, Capabilities, DashConfig, EngineFactory,
    HlsConfig,
};
use super::error::{BackendError, ErrorClass, PlayError};
use super::media::{Envelope, EventSink, ListenerId, MediaElement, MediaEvent, MediaEventKind};
use super::resolver::FormatResolver;
use super::state::{PlaybackUiState, StatusLine, UiAction};
use super::types::CandidateSource;

/// Controller settings
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Start playback as soon as a candidate is ready
    pub autoplay: bool,
    /// Let the media element play HLS itself when it can
    pub prefer_native_hls: bool,
    /// Consecutive fatal network/media recoveries allowed per candidate before
    /// moving on. A recovery that brings the stream back resets its class.
    pub max_recoveries: u32,
    pub picture_in_picture: bool,
    pub hls: HlsConfig,
    pub dash: DashConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autoplay: true,
            prefer_native_hls: false,
            max_recoveries: 3,
            picture_in_picture: true,
            hls: HlsConfig::default(),
            dash: DashConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Resolving,
    /// Index into the candidate list
    Attaching { candidate: usize },
    Playing { candidate: usize },
    Failed { reason: String },
}

impl SessionState {
    pub fn candidate(&self) -> Option<usize> {
        match self {
            SessionState::Attaching { candidate } | SessionState::Playing { candidate } => {
                Some(*candidate)
            }
            _ => None,
        }
    }
}

/// Window-level changes the player surface must apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRequest {
    EnterFullscreen,
    ExitFullscreen,
    EnterPictureInPicture,
    ExitPictureInPicture,
}

#[derive(Debug, Default, Clone, Copy)]
struct RecoveryCount {
    network: u32,
    media: u32,
    /// Class of the last recovery still waiting for the stream to come back
    pending: Option<ErrorClass>,
}

impl RecoveryCount {
    /// The stream came back after a recovery; that class starts counting afresh
    fn succeeded(&mut self) {
        match self.pending.take() {
            Some(ErrorClass::Network) => self.network = 0,
            Some(ErrorClass::Media) => self.media = 0,
            Some(ErrorClass::Other) | None => {}
        }
    }
}

pub struct SessionController<M: MediaElement> {
    pub(super) media: M,
    pub(super) engines: Box<dyn EngineFactory>,
    pub(super) resolver: FormatResolver,
    pub(super) config: SessionConfig,
    pub(super) state: SessionState,
    pub(super) ui: PlaybackUiState,
    pub(super) stream: Option<StreamDescriptor>,
    pub(super) candidates: Vec<CandidateSource>,
    pub(super) backend: Option<Backend>,
    pub(super) fullscreen: bool,
    pub(super) picture_in_picture: bool,
    pub(super) surface_requests: Vec<SurfaceRequest>,
    listeners: Vec<ListenerId>,
    generation: u64,
    /// Bumped on every successful attach; stops signal processing from a replaced backend
    attachment: u64,
    recoveries: RecoveryCount,
    events_tx: Sender<Envelope>,
    events_rx: Receiver<Envelope>,
}

impl<M: MediaElement> SessionController<M> {
    pub fn new(
        media: M,
        engines: Box<dyn EngineFactory>,
        resolver: FormatResolver,
        config: SessionConfig,
    ) -> Self {
        let (events_tx, events_rx) = channel();
        let ui = PlaybackUiState {
            volume: media.volume(),
            muted: media.muted(),
            playback_rate: media.playback_rate(),
            ..PlaybackUiState::default()
        };
        Self {
            media,
            engines,
            resolver,
            config,
            state: SessionState::Idle,
            ui,
            stream: None,
            candidates: Vec::new(),
            backend: None,
            fullscreen: false,
            picture_in_picture: false,
            surface_requests: Vec::new(),
            listeners: Vec::new(),
            generation: 0,
            attachment: 0,
            recoveries: RecoveryCount::default(),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn ui(&self) -> &PlaybackUiState {
        &self.ui
    }

    pub fn stream(&self) -> Option<&StreamDescriptor> {
        self.stream.as_ref()
    }

    pub fn candidates(&self) -> &[CandidateSource] {
        &self.candidates
    }

    pub fn current_candidate(&self) -> Option<&CandidateSource> {
        self.state.candidate().and_then(|i| self.candidates.get(i))
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(Backend::kind)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    pub fn resolver_mut(&mut self) -> &mut FormatResolver {
        &mut self.resolver
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, SessionState::Idle)
    }

    /// Start a new session for `stream`, destroying the current one first
    pub fn load(&mut self, stream: StreamDescriptor) {
        info!("Loading stream '{}' ({})", stream.name, stream.id);
        self.teardown();
        self.state = SessionState::Resolving;

        match self.resolver.resolve(&stream) {
            Ok(candidates) => {
                debug!("Resolved {} candidate(s) for '{}'", candidates.len(), stream.name);
                self.candidates = candidates;
                self.stream = Some(stream);
            }
            Err(e) => {
                self.stream = Some(stream);
                self.fail(e.to_string());
                return;
            }
        }

        self.register_listeners();
        self.attach_from(0);
    }

    /// Reload the last stream, e.g. after a failure
    pub fn retry(&mut self) {
        if let Some(stream) = self.stream.clone() {
            self.load(stream);
        }
    }

    /// Tear the session down and forget the stream
    pub fn stop(&mut self) {
        self.teardown();
        self.stream = None;
    }

    /// Process queued media events and backend signals
    pub fn poll(&mut self) {
        while let Ok(envelope) = self.events_rx.try_recv() {
            if envelope.generation != self.generation {
                debug!(
                    "Dropping stale media event from generation {} (current {})",
                    envelope.generation, self.generation
                );
                continue;
            }
            self.handle_media_event(envelope.event);
        }

        let attachment = self.attachment;
        let signals = match self.backend.as_mut() {
            Some(backend) => backend.poll(&mut self.media),
            None => return,
        };
        for signal in signals {
            if self.attachment != attachment || self.backend.is_none() {
                break;
            }
            self.handle_signal(signal);
        }
    }

    /// Drain window-level requests (fullscreen, picture-in-picture)
    pub fn take_surface_requests(&mut self) -> Vec<SurfaceRequest> {
        std::mem::take(&mut self.surface_requests)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_picture_in_picture(&self) -> bool {
        self.picture_in_picture
    }

    fn register_listeners(&mut self) {
        for kind in MediaEventKind::SESSION {
            let sink = EventSink::new(self.generation, self.events_tx.clone());
            let id = self.media.add_listener(kind, sink);
            self.listeners.push(id);
        }
    }

    /// Try candidates from `start` on until one attaches
    fn attach_from(&mut self, start: usize) {
        for index in start..self.candidates.len() {
            let candidate = self.candidates[index].clone();
            let caps = Capabilities::probe(&self.media, self.engines.as_ref());
            let Some(kind) = select_backend(&candidate.format, &caps, self.config.prefer_native_hls) else {
                debug!("No backend can play {} ({}), skipping", candidate.format, candidate.url);
                continue;
            };

            self.state = SessionState::Attaching { candidate: index };
            self.recoveries = RecoveryCount::default();

            match Backend::attach(
                kind,
                &mut self.media,
                &candidate.url,
                self.engines.as_ref(),
                &self.config.hls,
                &self.config.dash,
            ) {
                Ok(backend) => {
                    info!("Attached {} backend for {}", kind, candidate.url);
                    self.backend = Some(backend);
                    self.attachment += 1;
                    self.ui.reduce(UiAction::BackendAttached { kind, url: candidate.url });
                    return;
                }
                Err(e) => {
                    warn!("{} setup failed for {}: {}", kind, candidate.url, e);
                    self.detach_media();
                }
            }
        }

        self.fail("No supported video format found".to_string());
    }

    /// Destroy the current backend and move on to the next candidate
    fn fall_through(&mut self, reason: &str) {
        let next = self.state.candidate().map(|i| i + 1).unwrap_or(self.candidates.len());
        if let Some(backend) = self.backend.take() {
            backend.destroy(&mut self.media);
        }
        self.detach_media();

        if next < self.candidates.len() {
            warn!("Source failed ({}), trying next candidate", reason);
            self.ui.reduce(UiAction::Status(StatusLine::transient(format!(
                "Source failed ({}), trying another format...",
                reason
            ))));
        }
        self.attach_from(next);
    }

    fn fail(&mut self, reason: String) {
        error!("Playback failed: {}", reason);
        self.ui.reduce(UiAction::Status(StatusLine::terminal(reason.clone())));
        self.state = SessionState::Failed { reason };
    }

    fn enter_playing(&mut self, candidate: usize) {
        info!("Playing candidate {} via {:?}", candidate, self.backend_kind());
        self.state = SessionState::Playing { candidate };
        self.ui.reduce(UiAction::ClearStatus);
        if self.config.autoplay {
            self.request_play();
        }
    }

    /// `play()` rejections never end the session
    pub(super) fn request_play(&mut self) {
        match self.media.play() {
            Ok(()) => {}
            Err(PlayError::Aborted) => debug!("Play request aborted by a newer load"),
            Err(e @ PlayError::NotAllowed(_)) => {
                warn!("Autoplay blocked: {}", e);
                self.ui.reduce(UiAction::Status(StatusLine::transient(
                    "Autoplay was blocked, press play to start",
                )));
            }
            Err(e) => {
                warn!("Play request failed: {}", e);
                self.ui.reduce(UiAction::Status(StatusLine::transient(format!(
                    "Failed to start playback: {}",
                    e
                ))));
            }
        }
    }

    fn handle_media_event(&mut self, event: MediaEvent) {
        let element_driven = matches!(
            self.backend_kind(),
            Some(BackendKind::NativeHls | BackendKind::Progressive)
        );

        let attaching = match self.state {
            SessionState::Attaching { candidate } => Some(candidate),
            _ => None,
        };

        match (attaching, event) {
            (Some(candidate), event @ MediaEvent::LoadedMetadata { .. }) if element_driven => {
                self.ui.reduce(UiAction::Media(event));
                self.enter_playing(candidate);
            }
            (Some(_), MediaEvent::Error { message }) if element_driven => {
                self.fall_through(&message);
            }
            // The element decodes what a managed engine hands it, so its
            // failures are the engine's fatal media errors
            (_, MediaEvent::Error { message }) if self.backend.is_some() && !element_driven => {
                self.handle_backend_error(BackendError::fatal(ErrorClass::Media, message));
            }
            (_, event) => {
                if matches!(event, MediaEvent::LoadedMetadata { .. }) {
                    self.recoveries.succeeded();
                }
                self.ui.reduce(UiAction::Media(event));
            }
        }
    }

    fn handle_signal(&mut self, signal: BackendSignal) {
        match signal {
            BackendSignal::Ready { levels } => {
                self.recoveries.succeeded();
                self.ui.reduce(UiAction::LevelsReady(levels));
                if let SessionState::Attaching { candidate } = self.state {
                    self.enter_playing(candidate);
                }
            }
            BackendSignal::QualitySwitched { level } => {
                self.ui.reduce(UiAction::QualitySwitched(level));
            }
            BackendSignal::Error(e) => self.handle_backend_error(e),
        }
    }

    fn handle_backend_error(&mut self, e: BackendError) {
        if !e.fatal {
            debug!("Recoverable backend error: {}", e);
            self.ui.reduce(UiAction::Status(StatusLine::transient(user_message(&e))));
            return;
        }

        let max = self.config.max_recoveries;
        match e.class {
            ErrorClass::Network if self.recoveries.network < max => {
                self.recoveries.network += 1;
                self.recoveries.pending = Some(ErrorClass::Network);
                let restarted = self
                    .backend
                    .as_mut()
                    .map(Backend::restart_load)
                    .unwrap_or(false);
                if restarted {
                    warn!("Fatal network error, restarting load ({}/{}): {}", self.recoveries.network, max, e.message);
                    self.ui.reduce(UiAction::Status(StatusLine::transient("Network error, reconnecting...")));
                    return;
                }
            }
            ErrorClass::Media if self.recoveries.media < max => {
                self.recoveries.media += 1;
                self.recoveries.pending = Some(ErrorClass::Media);
                let recovered = match self.backend.as_mut() {
                    Some(backend) => backend.recover_media(&mut self.media),
                    None => false,
                };
                if recovered {
                    warn!("Fatal media error, recovering decoder ({}/{}): {}", self.recoveries.media, max, e.message);
                    self.ui.reduce(UiAction::Status(StatusLine::transient("Media error, recovering...")));
                    return;
                }
            }
            _ => {}
        }

        error!("Unrecoverable backend error: {}", e);
        self.fall_through(&user_message(&e));
    }

    fn detach_media(&mut self) {
        self.media.pause();
        self.media.clear_src();
    }

    /// Destroy backend, remove listeners, detach the element and reset UI state.
    /// Bumps the generation so nothing queued for the old session is applied.
    fn teardown(&mut self) {
        self.generation += 1;

        if let Some(backend) = self.backend.take() {
            debug!("Destroying {} backend", backend.kind());
            backend.destroy(&mut self.media);
        }
        for id in self.listeners.drain(..) {
            self.media.remove_listener(id);
        }
        if !matches!(self.state, SessionState::Idle) {
            self.detach_media();
        }
        while self.events_rx.try_recv().is_ok() {}

        self.candidates.clear();
        self.recoveries = RecoveryCount::default();
        self.state = SessionState::Idle;
        self.ui.reduce(UiAction::Reset {
            volume: self.media.volume(),
            muted: self.media.muted(),
            playback_rate: self.media.playback_rate(),
        });
    }
}

impl<M: MediaElement> Drop for SessionController<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn user_message(e: &BackendError) -> String {
    match e.class {
        ErrorClass::Network => format!("Network problem: {}", e.message),
        ErrorClass::Media => format!("Media problem: {}", e.message),
        ErrorClass::Other => e.message.clone(),
    }
}
