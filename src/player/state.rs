//! Derived playback UI state
//!
//! Everything the player surface shows is kept in one [`PlaybackUiState`]
//! and changed only through [`PlaybackUiState::reduce`]. It never drives the
//! backend; it is rebuilt from what the backend and media element report.

use super::backend::BackendKind;
use super::media::MediaEvent;
use super::types::{QualityLevel, QualitySelection};

/// Speeds offered by the speed selector
pub const PLAYBACK_RATES: [f64; 7] = [0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Retried or recovered in place
    Transient,
    /// Needs a new stream selection (or a retry)
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusLine {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Transient, message: message.into() }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Terminal, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Media(MediaEvent),
    BackendAttached { kind: BackendKind, url: String },
    LevelsReady(Vec<QualityLevel>),
    QualitySelected(QualitySelection),
    QualitySwitched(Option<QualityLevel>),
    PlaybackRate(f64),
    Status(StatusLine),
    ClearStatus,
    /// Back to defaults, keeping the element's volume, mute and rate
    Reset { volume: f32, muted: bool, playback_rate: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackUiState {
    pub is_playing: bool,
    pub current_time: f64,
    /// NaN until metadata arrives; infinite for live
    pub duration: f64,
    pub volume: f32,
    pub muted: bool,
    pub playback_rate: f64,
    pub buffered_end: f64,
    pub quality_levels: Vec<QualityLevel>,
    pub selected_quality: QualitySelection,
    pub quality_label: String,
    pub bitrate: Option<u64>,
    pub backend: Option<BackendKind>,
    pub active_url: Option<String>,
    pub status: Option<StatusLine>,
}

impl Default for PlaybackUiState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            buffered_end: 0.0,
            quality_levels: Vec::new(),
            selected_quality: QualitySelection::Auto,
            quality_label: "Auto".to_string(),
            bitrate: None,
            backend: None,
            active_url: None,
            status: None,
        }
    }
}

impl PlaybackUiState {
    pub fn reduce(&mut self, action: UiAction) {
        match action {
            UiAction::Media(event) => self.apply_media(event),
            UiAction::BackendAttached { kind, url } => {
                self.backend = Some(kind);
                self.active_url = Some(url);
                self.quality_levels.clear();
                self.selected_quality = QualitySelection::Auto;
                self.quality_label = match kind {
                    BackendKind::ManagedHls | BackendKind::ManagedDash => "Auto".to_string(),
                    BackendKind::NativeHls | BackendKind::Progressive => "Original".to_string(),
                };
                self.bitrate = None;
            }
            UiAction::LevelsReady(levels) => {
                self.quality_levels = levels;
                // A manifest reload keeps a manual choice that still exists
                let keep = match self.selected_quality {
                    QualitySelection::Level(i) => i < self.quality_levels.len(),
                    QualitySelection::Auto => false,
                };
                if !keep {
                    self.selected_quality = QualitySelection::Auto;
                    self.quality_label = "Auto".to_string();
                }
            }
            UiAction::QualitySelected(selection) => {
                self.selected_quality = selection;
                self.quality_label = match selection {
                    QualitySelection::Auto => "Auto".to_string(),
                    QualitySelection::Level(i) => self
                        .quality_levels
                        .get(i)
                        .map(QualityLevel::short_label)
                        .unwrap_or_else(|| "Auto".to_string()),
                };
            }
            UiAction::QualitySwitched(level) => match level {
                Some(level) => {
                    self.bitrate = level.bitrate;
                    let label = level.short_label();
                    self.quality_label = match self.selected_quality {
                        QualitySelection::Auto => format!("Auto ({})", label),
                        QualitySelection::Level(_) => label,
                    };
                }
                None => {
                    self.bitrate = None;
                }
            },
            UiAction::PlaybackRate(rate) => self.playback_rate = rate,
            UiAction::Status(status) => self.status = Some(status),
            UiAction::ClearStatus => self.status = None,
            UiAction::Reset { volume, muted, playback_rate } => {
                *self = Self { volume, muted, playback_rate, ..Self::default() };
            }
        }
    }

    fn apply_media(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Play => self.is_playing = true,
            MediaEvent::Pause => self.is_playing = false,
            MediaEvent::TimeUpdate { current_time, buffered_end } => {
                self.current_time = if current_time.is_finite() { current_time.max(0.0) } else { 0.0 };
                if let Some(end) = buffered_end.filter(|e| e.is_finite()) {
                    self.buffered_end = end;
                }
            }
            MediaEvent::LoadedMetadata { duration } => self.duration = duration,
            MediaEvent::VolumeChange { volume, muted } => {
                self.volume = volume.clamp(0.0, 1.0);
                self.muted = muted;
            }
            MediaEvent::Error { message } => {
                self.status = Some(StatusLine::transient(format!("Video playback error: {}", message)));
            }
        }
    }

    /// Live streams report a non-finite duration
    pub fn is_live(&self) -> bool {
        !self.duration.is_finite()
    }

    /// The quality selector is only enabled for managed backends with levels to choose from
    pub fn quality_control_enabled(&self) -> bool {
        self.backend
            .map(|kind| kind.supports_quality_selection())
            .unwrap_or(false)
            && !self.quality_levels.is_empty()
    }

    /// Selector entries: "Auto" first, then levels from highest to lowest
    pub fn quality_options(&self) -> Vec<(String, QualitySelection)> {
        let mut levels: Vec<&QualityLevel> = self.quality_levels.iter().collect();
        levels.sort_by(|a, b| {
            b.height
                .unwrap_or(0)
                .cmp(&a.height.unwrap_or(0))
                .then(b.bitrate.unwrap_or(0).cmp(&a.bitrate.unwrap_or(0)))
        });

        let mut options = vec![("Auto".to_string(), QualitySelection::Auto)];
        options.extend(
            levels
                .into_iter()
                .map(|l| (l.label(), QualitySelection::Level(l.index))),
        );
        options
    }

    /// Buffered fraction of a finite-duration asset, for the seek bar
    pub fn buffered_fraction(&self) -> Option<f32> {
        if self.duration.is_finite() && self.duration > 0.0 {
            Some((self.buffered_end / self.duration).clamp(0.0, 1.0) as f32)
        } else {
            None
        }
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour; non-finite values show as `00:00`
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "00:00".to_string();
    }
    let total = secs.floor() as u64;
    let s = total % 60;
    let m = (total / 60) % 60;
    let h = total / 3600;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(index: usize, height: u32, kbps: u64) -> QualityLevel {
        QualityLevel { index, height: Some(height), bitrate: Some(kbps * 1000), name: None }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.4), "01:05");
        assert_eq!(format_time(3725.0), "1:02:05");
        assert_eq!(format_time(f64::INFINITY), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn test_media_events_update_state() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::Media(MediaEvent::Play));
        state.reduce(UiAction::Media(MediaEvent::TimeUpdate { current_time: 12.5, buffered_end: Some(20.0) }));
        state.reduce(UiAction::Media(MediaEvent::LoadedMetadata { duration: 100.0 }));
        state.reduce(UiAction::Media(MediaEvent::VolumeChange { volume: 0.4, muted: true }));

        assert!(state.is_playing);
        assert_eq!(state.current_time, 12.5);
        assert_eq!(state.buffered_end, 20.0);
        assert!(!state.is_live());
        assert_eq!(state.buffered_fraction(), Some(0.2));
        assert_eq!(state.volume, 0.4);
        assert!(state.muted);

        state.reduce(UiAction::Media(MediaEvent::Pause));
        assert!(!state.is_playing);
    }

    #[test]
    fn test_live_has_no_buffered_fraction() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::Media(MediaEvent::LoadedMetadata { duration: f64::INFINITY }));
        assert!(state.is_live());
        assert_eq!(state.buffered_fraction(), None);
    }

    #[test]
    fn test_quality_options_sorted_high_to_low() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::BackendAttached { kind: BackendKind::ManagedHls, url: "u".into() });
        state.reduce(UiAction::LevelsReady(vec![level(0, 360, 800), level(1, 1080, 6000), level(2, 720, 3000)]));

        let options = state.quality_options();
        assert_eq!(options[0], ("Auto".to_string(), QualitySelection::Auto));
        assert_eq!(options[1].1, QualitySelection::Level(1));
        assert_eq!(options[2].1, QualitySelection::Level(2));
        assert_eq!(options[3].1, QualitySelection::Level(0));
        assert!(state.quality_control_enabled());
    }

    #[test]
    fn test_quality_disabled_for_native() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::BackendAttached { kind: BackendKind::NativeHls, url: "u".into() });
        state.reduce(UiAction::LevelsReady(vec![level(0, 720, 3000)]));
        assert!(!state.quality_control_enabled());
        assert_eq!(state.backend, Some(BackendKind::NativeHls));
    }

    #[test]
    fn test_quality_labels_follow_switches() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::BackendAttached { kind: BackendKind::ManagedHls, url: "u".into() });
        state.reduce(UiAction::LevelsReady(vec![level(0, 480, 1200), level(1, 720, 3000)]));

        state.reduce(UiAction::QualitySwitched(Some(level(1, 720, 3000))));
        assert_eq!(state.quality_label, "Auto (720p)");
        assert_eq!(state.bitrate, Some(3_000_000));

        state.reduce(UiAction::QualitySelected(QualitySelection::Level(0)));
        assert_eq!(state.quality_label, "480p");
        state.reduce(UiAction::QualitySwitched(Some(level(0, 480, 1200))));
        assert_eq!(state.quality_label, "480p");
        assert_eq!(state.bitrate, Some(1_200_000));
    }

    #[test]
    fn test_reset_keeps_element_settings() {
        let mut state = PlaybackUiState::default();
        state.reduce(UiAction::BackendAttached { kind: BackendKind::ManagedDash, url: "u".into() });
        state.reduce(UiAction::Status(StatusLine::terminal("boom")));
        state.reduce(UiAction::Reset { volume: 0.3, muted: true, playback_rate: 1.5 });

        assert_eq!(state.backend, None);
        assert_eq!(state.status, None);
        assert_eq!(state.volume, 0.3);
        assert!(state.muted);
        assert_eq!(state.playback_rate, 1.5);
        assert!(state.duration.is_nan());
    }
}
