//! Managed DASH adapter

use std::time::Duration;

use tracing::{debug, warn};

use super::{BackendSignal, EngineFactory};
use crate::player::error::{BackendError, ErrorClass};
use crate::player::media::MediaElement;
use crate::player::types::{QualityLevel, QualitySelection};

#[derive(Debug, Clone, PartialEq)]
pub struct DashConfig {
    pub manifest_load_timeout: Duration,
    /// Start with automatic bitrate switching
    pub auto_switch_bitrate: bool,
    pub user_agent: Option<String>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            manifest_load_timeout: Duration::from_secs(15),
            auto_switch_bitrate: true,
            user_agent: None,
        }
    }
}

/// A video representation from the MPD
#[derive(Debug, Clone, PartialEq)]
pub struct DashTrack {
    pub id: String,
    /// Bits per second
    pub bandwidth: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashErrorCode {
    ManifestLoad,
    SegmentLoad,
    ManifestParse,
    MediaSource,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashEvent {
    ManifestLoaded,
    QualityChangeRendered { index: usize },
    Error { code: DashErrorCode, message: String },
}

/// An adaptive DASH engine bound to a media element
pub trait DashEngine {
    fn initialize(&mut self, media: &mut dyn MediaElement, url: &str) -> Result<(), BackendError>;
    /// Load a manifest again on the already initialised engine
    fn attach_source(&mut self, url: &str);

    /// Video tracks in manifest order
    fn bitrate_list(&self) -> &[DashTrack];
    /// Track currently rendered, if known
    fn quality(&self) -> Option<usize>;
    fn set_quality(&mut self, index: usize, media: &mut dyn MediaElement);
    fn auto_switch(&self) -> bool;
    fn set_auto_switch(&mut self, enabled: bool, media: &mut dyn MediaElement);

    fn poll_events(&mut self, media: &mut dyn MediaElement) -> Vec<DashEvent>;
    /// Tear the engine down; it must be inert when this returns
    fn reset(&mut self, media: &mut dyn MediaElement);
}

pub struct DashAdapter {
    engine: Box<dyn DashEngine>,
    url: String,
    levels: Vec<QualityLevel>,
    selection: QualitySelection,
}

impl DashAdapter {
    pub fn attach(
        engines: &dyn EngineFactory,
        media: &mut dyn MediaElement,
        url: &str,
        config: &DashConfig,
    ) -> Result<Self, BackendError> {
        let mut engine = engines.create_dash(config)?;
        if let Err(e) = engine.initialize(media, url) {
            engine.reset(media);
            return Err(e);
        }
        Ok(Self {
            engine,
            url: url.to_string(),
            levels: Vec::new(),
            selection: QualitySelection::Auto,
        })
    }

    pub fn quality_levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn current_quality(&self) -> QualitySelection {
        self.selection
    }

    pub fn set_quality(&mut self, selection: QualitySelection, media: &mut dyn MediaElement) -> bool {
        match selection {
            QualitySelection::Auto => {
                self.engine.set_auto_switch(true, media);
            }
            QualitySelection::Level(index) => {
                if index >= self.levels.len() {
                    warn!("Ignoring DASH track {} (only {} tracks)", index, self.levels.len());
                    return false;
                }
                // Manual choice only sticks with ABR off
                self.engine.set_auto_switch(false, media);
                self.engine.set_quality(index, media);
            }
        }
        self.selection = selection;
        true
    }

    pub fn restart_load(&mut self) {
        self.engine.attach_source(&self.url);
    }

    pub fn poll(&mut self, media: &mut dyn MediaElement) -> Vec<BackendSignal> {
        let mut signals = Vec::new();
        for event in self.engine.poll_events(media) {
            match event {
                DashEvent::ManifestLoaded => {
                    self.levels = self
                        .engine
                        .bitrate_list()
                        .iter()
                        .enumerate()
                        .map(|(index, track)| QualityLevel {
                            index,
                            height: track.height,
                            bitrate: Some(track.bandwidth).filter(|b| *b > 0),
                            name: Some(track.id.clone()).filter(|id| !id.is_empty()),
                        })
                        .collect();
                    debug!("DASH manifest loaded with {} video tracks", self.levels.len());
                    signals.push(BackendSignal::Ready { levels: self.levels.clone() });
                }
                DashEvent::QualityChangeRendered { index } => {
                    signals.push(BackendSignal::QualitySwitched {
                        level: self.levels.get(index).cloned(),
                    });
                }
                DashEvent::Error { code, message } => {
                    signals.push(BackendSignal::Error(translate_error(code, message)));
                }
            }
        }
        signals
    }

    pub fn destroy(mut self, media: &mut dyn MediaElement) {
        self.engine.reset(media);
        self.levels.clear();
    }
}

/// DASH engine errors are all fatal for the current source. Load failures can
/// be retried by attaching the manifest again; everything else moves on.
fn translate_error(code: DashErrorCode, message: String) -> BackendError {
    let class = match code {
        DashErrorCode::ManifestLoad | DashErrorCode::SegmentLoad => ErrorClass::Network,
        DashErrorCode::ManifestParse | DashErrorCode::MediaSource | DashErrorCode::Other => {
            ErrorClass::Other
        }
    };
    BackendError::fatal(class, message)
}
