//! Transport controls: play/pause, seeking, volume, speed, quality and
//! surface toggles. Every command goes straight to the media element or the
//! active backend; the UI state follows from the events they emit.

use tracing::{debug, info};

use super::backend::Backend;
use super::media::MediaElement;
use super::session::{SessionController, SurfaceRequest};
use super::state::{StatusLine, UiAction};
use super::types::QualitySelection;

/// Seconds skipped by the seek keys and buttons
pub const SEEK_STEP: f64 = 5.0;
/// Volume change per key press
pub const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    TogglePlay,
    SeekTo(f64),
    SeekBy(f64),
    SetVolume(f32),
    AdjustVolume(f32),
    ToggleMute,
    SetPlaybackRate(f64),
    SelectQuality(QualitySelection),
    ToggleFullscreen,
    TogglePictureInPicture,
}

impl<M: MediaElement> SessionController<M> {
    pub fn execute(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::TogglePlay => self.toggle_play(),
            TransportCommand::SeekTo(t) => self.seek_to(t),
            TransportCommand::SeekBy(delta) => self.seek_by(delta),
            TransportCommand::SetVolume(v) => self.set_volume(v),
            TransportCommand::AdjustVolume(delta) => self.adjust_volume(delta),
            TransportCommand::ToggleMute => self.toggle_mute(),
            TransportCommand::SetPlaybackRate(rate) => self.set_playback_rate(rate),
            TransportCommand::SelectQuality(selection) => {
                self.select_quality(selection);
            }
            TransportCommand::ToggleFullscreen => self.toggle_fullscreen(),
            TransportCommand::TogglePictureInPicture => self.toggle_picture_in_picture(),
        }
    }

    pub fn toggle_play(&mut self) {
        if self.media.src().is_none() && self.backend.is_none() {
            return;
        }
        if self.media.paused() {
            self.request_play();
        } else {
            self.media.pause();
        }
    }

    /// Seek to `seconds`, clamped to `[0, duration]` when the duration is finite
    pub fn seek_to(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let duration = self.media.duration();
        let target = if duration.is_finite() {
            seconds.clamp(0.0, duration.max(0.0))
        } else {
            seconds.max(0.0)
        };
        self.media.set_current_time(target);
    }

    pub fn seek_by(&mut self, delta: f64) {
        let now = self.media.current_time();
        self.seek_to(now + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(volume);
        if volume > 0.0 && self.media.muted() {
            self.media.set_muted(false);
        }
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        let volume = self.media.volume();
        self.set_volume(volume + delta);
    }

    pub fn toggle_mute(&mut self) {
        let muted = self.media.muted();
        self.media.set_muted(!muted);
    }

    /// Positive, finite rates only
    pub fn set_playback_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            debug!("Ignoring playback rate {}", rate);
            return;
        }
        self.media.set_playback_rate(rate);
        self.ui.reduce(UiAction::PlaybackRate(rate));
    }

    /// Returns false without touching anything when the active backend has
    /// no level control (native HLS, progressive, or none at all).
    pub fn select_quality(&mut self, selection: QualitySelection) -> bool {
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        if matches!(backend, Backend::NativeHls | Backend::Progressive) {
            return false;
        }
        if !backend.set_quality(selection, &mut self.media) {
            return false;
        }
        info!("Quality set to {:?}", selection);
        self.ui.reduce(UiAction::QualitySelected(selection));
        true
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        self.surface_requests.push(if self.fullscreen {
            SurfaceRequest::EnterFullscreen
        } else {
            SurfaceRequest::ExitFullscreen
        });
    }

    pub fn toggle_picture_in_picture(&mut self) {
        if self.picture_in_picture {
            self.picture_in_picture = false;
            self.surface_requests.push(SurfaceRequest::ExitPictureInPicture);
            return;
        }
        if !self.config.picture_in_picture || self.backend.is_none() {
            self.ui.reduce(UiAction::Status(StatusLine::transient(
                "Picture-in-picture is not available",
            )));
            return;
        }
        self.picture_in_picture = true;
        self.surface_requests.push(SurfaceRequest::EnterPictureInPicture);
    }
}
