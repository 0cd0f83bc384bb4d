//! Playback backends
//!
//! A session plays each candidate through exactly one backend. Which one is
//! decided by [`select_backend`], a pure function over the runtime
//! [`Capabilities`]; the backends themselves are a closed set held in the
//! [`Backend`] enum.

mod dash;
mod hls;

pub use dash::{DashAdapter, DashConfig, DashEngine, DashErrorCode, DashEvent, DashTrack};
pub use hls::{HlsAdapter, HlsConfig, HlsEngine, HlsErrorType, HlsEvent, HlsLevel};

use std::fmt;

use super::error::BackendError;
use super::media::MediaElement;
use super::types::{ContainerFormat, QualityLevel, QualitySelection};

/// Which backend a candidate is played through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The media element plays the HLS manifest itself
    NativeHls,
    ManagedHls,
    ManagedDash,
    /// Single-bitrate file handed straight to the media element
    Progressive,
}

impl BackendKind {
    /// Only managed engines expose manual level control
    pub fn supports_quality_selection(&self) -> bool {
        matches!(self, BackendKind::ManagedHls | BackendKind::ManagedDash)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::NativeHls => "native HLS",
            BackendKind::ManagedHls => "HLS",
            BackendKind::ManagedDash => "DASH",
            BackendKind::Progressive => "direct",
        })
    }
}

/// Creates managed streaming engines. Implemented by the networked engines
/// in `crate::engine` and by fakes in tests.
pub trait EngineFactory {
    fn hls_supported(&self) -> bool;
    fn dash_supported(&self) -> bool;
    fn create_hls(&self, config: &HlsConfig) -> Result<Box<dyn HlsEngine>, BackendError>;
    fn create_dash(&self, config: &DashConfig) -> Result<Box<dyn DashEngine>, BackendError>;
}

/// What the runtime can play, probed once per candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub native_hls: bool,
    pub native_dash: bool,
    pub managed_hls: bool,
    pub managed_dash: bool,
    pub mpeg_ts: bool,
    pub mp4: bool,
}

impl Capabilities {
    pub fn probe(media: &dyn MediaElement, engines: &dyn EngineFactory) -> Self {
        let can = |format: ContainerFormat| {
            format
                .mime_type()
                .map(|mime| media.can_play_type(mime).is_playable())
                .unwrap_or(false)
        };
        Self {
            native_hls: can(ContainerFormat::Hls),
            native_dash: can(ContainerFormat::Dash),
            managed_hls: engines.hls_supported(),
            managed_dash: engines.dash_supported(),
            mpeg_ts: can(ContainerFormat::MpegTs),
            mp4: can(ContainerFormat::Mp4),
        }
    }
}

/// Pick the backend for a candidate format, or `None` when nothing here can play it.
///
/// Managed HLS wins over native HLS unless `prefer_native_hls` is set, since
/// only the managed engine exposes quality levels. Formats without a MIME
/// type are always handed to the media element as the last resort.
pub fn select_backend(
    format: &ContainerFormat,
    caps: &Capabilities,
    prefer_native_hls: bool,
) -> Option<BackendKind> {
    match format {
        ContainerFormat::Hls => {
            if prefer_native_hls && caps.native_hls {
                Some(BackendKind::NativeHls)
            } else if caps.managed_hls {
                Some(BackendKind::ManagedHls)
            } else if caps.native_hls {
                Some(BackendKind::NativeHls)
            } else {
                None
            }
        }
        ContainerFormat::Dash => {
            if caps.managed_dash {
                Some(BackendKind::ManagedDash)
            } else if caps.native_dash {
                Some(BackendKind::Progressive)
            } else {
                None
            }
        }
        ContainerFormat::MpegTs => caps.mpeg_ts.then_some(BackendKind::Progressive),
        ContainerFormat::Mp4 => caps.mp4.then_some(BackendKind::Progressive),
        ContainerFormat::Other(_) => Some(BackendKind::Progressive),
    }
}

/// Translated backend output consumed by the session controller
#[derive(Debug, Clone, PartialEq)]
pub enum BackendSignal {
    /// Manifest parsed; levels may be empty for single-rendition streams
    Ready { levels: Vec<QualityLevel> },
    /// The engine switched rendition (`None` when the level is unknown)
    QualitySwitched { level: Option<QualityLevel> },
    Error(BackendError),
}

/// The backend attached for the current candidate
pub enum Backend {
    NativeHls,
    ManagedHls(HlsAdapter),
    ManagedDash(DashAdapter),
    Progressive,
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::NativeHls => BackendKind::NativeHls,
            Backend::ManagedHls(_) => BackendKind::ManagedHls,
            Backend::ManagedDash(_) => BackendKind::ManagedDash,
            Backend::Progressive => BackendKind::Progressive,
        }
    }

    /// Attach `url` to `media` through the backend `kind`
    pub fn attach(
        kind: BackendKind,
        media: &mut dyn MediaElement,
        url: &str,
        engines: &dyn EngineFactory,
        hls: &HlsConfig,
        dash: &DashConfig,
    ) -> Result<Self, BackendError> {
        match kind {
            BackendKind::NativeHls | BackendKind::Progressive => {
                media.set_src(url);
                media.load();
                Ok(if kind == BackendKind::NativeHls { Backend::NativeHls } else { Backend::Progressive })
            }
            BackendKind::ManagedHls => {
                HlsAdapter::attach(engines, media, url, hls).map(Backend::ManagedHls)
            }
            BackendKind::ManagedDash => {
                DashAdapter::attach(engines, media, url, dash).map(Backend::ManagedDash)
            }
        }
    }

    pub fn quality_levels(&self) -> &[QualityLevel] {
        match self {
            Backend::ManagedHls(adapter) => adapter.quality_levels(),
            Backend::ManagedDash(adapter) => adapter.quality_levels(),
            Backend::NativeHls | Backend::Progressive => &[],
        }
    }

    pub fn current_quality(&self) -> QualitySelection {
        match self {
            Backend::ManagedHls(adapter) => adapter.current_quality(),
            Backend::ManagedDash(adapter) => adapter.current_quality(),
            Backend::NativeHls | Backend::Progressive => QualitySelection::Auto,
        }
    }

    /// Returns false when the backend has no manual level control
    pub fn set_quality(&mut self, selection: QualitySelection, media: &mut dyn MediaElement) -> bool {
        match self {
            Backend::ManagedHls(adapter) => adapter.set_quality(selection, media),
            Backend::ManagedDash(adapter) => adapter.set_quality(selection, media),
            Backend::NativeHls | Backend::Progressive => false,
        }
    }

    /// Re-issue loading after a fatal network error. Returns false when the
    /// backend has no such primitive.
    pub fn restart_load(&mut self) -> bool {
        match self {
            Backend::ManagedHls(adapter) => {
                adapter.restart_load();
                true
            }
            Backend::ManagedDash(adapter) => {
                adapter.restart_load();
                true
            }
            Backend::NativeHls | Backend::Progressive => false,
        }
    }

    /// Recover the decode pipeline after a fatal media error
    pub fn recover_media(&mut self, media: &mut dyn MediaElement) -> bool {
        match self {
            Backend::ManagedHls(adapter) => {
                adapter.recover_media(media);
                true
            }
            Backend::ManagedDash(_) | Backend::NativeHls | Backend::Progressive => false,
        }
    }

    pub fn poll(&mut self, media: &mut dyn MediaElement) -> Vec<BackendSignal> {
        match self {
            Backend::ManagedHls(adapter) => adapter.poll(media),
            Backend::ManagedDash(adapter) => adapter.poll(media),
            Backend::NativeHls | Backend::Progressive => Vec::new(),
        }
    }

    /// Release all engine resources. The media element itself is detached by the caller.
    pub fn destroy(self, media: &mut dyn MediaElement) {
        match self {
            Backend::ManagedHls(adapter) => adapter.destroy(media),
            Backend::ManagedDash(adapter) => adapter.destroy(media),
            Backend::NativeHls | Backend::Progressive => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> Capabilities {
        Capabilities {
            native_hls: true,
            native_dash: false,
            managed_hls: true,
            managed_dash: true,
            mpeg_ts: true,
            mp4: true,
        }
    }

    #[test]
    fn test_managed_hls_preferred_by_default() {
        assert_eq!(select_backend(&ContainerFormat::Hls, &caps(), false), Some(BackendKind::ManagedHls));
        assert_eq!(select_backend(&ContainerFormat::Hls, &caps(), true), Some(BackendKind::NativeHls));
    }

    #[test]
    fn test_native_hls_when_no_engine() {
        let caps = Capabilities { managed_hls: false, ..caps() };
        assert_eq!(select_backend(&ContainerFormat::Hls, &caps, false), Some(BackendKind::NativeHls));
        let caps = Capabilities { native_hls: false, ..caps };
        assert_eq!(select_backend(&ContainerFormat::Hls, &caps, false), None);
    }

    #[test]
    fn test_dash_selection() {
        assert_eq!(select_backend(&ContainerFormat::Dash, &caps(), false), Some(BackendKind::ManagedDash));
        let caps = Capabilities { managed_dash: false, ..caps() };
        assert_eq!(select_backend(&ContainerFormat::Dash, &caps, false), None);
    }

    #[test]
    fn test_progressive_checks_mime_support() {
        let caps = Capabilities { mpeg_ts: false, ..caps() };
        assert_eq!(select_backend(&ContainerFormat::MpegTs, &caps, false), None);
        assert_eq!(select_backend(&ContainerFormat::Mp4, &caps, false), Some(BackendKind::Progressive));
        assert_eq!(
            select_backend(&ContainerFormat::Other(None), &Capabilities::default(), false),
            Some(BackendKind::Progressive)
        );
    }

    #[test]
    fn test_quality_selection_support() {
        assert!(BackendKind::ManagedHls.supports_quality_selection());
        assert!(BackendKind::ManagedDash.supports_quality_selection());
        assert!(!BackendKind::NativeHls.supports_quality_selection());
        assert!(!BackendKind::Progressive.supports_quality_selection());
    }
}
