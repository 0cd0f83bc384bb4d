//! Managed HLS adapter
//!
//! Wraps an [`HlsEngine`] and translates its level list, level switches and
//! error taxonomy into [`BackendSignal`]s.

use std::time::Duration;

use tracing::{debug, warn};

use super::{BackendSignal, EngineFactory};
use crate::player::error::{BackendError, ErrorClass};
use crate::player::media::MediaElement;
use crate::player::types::{QualityLevel, QualitySelection, AUTO_LEVEL};

/// Tuning handed to the HLS engine
#[derive(Debug, Clone, PartialEq)]
pub struct HlsConfig {
    pub manifest_load_timeout: Duration,
    /// Initial level, or `AUTO_LEVEL`
    pub start_level: i32,
    /// Bandwidth assumed by automatic level selection, in bits per second
    pub abr_default_estimate: u64,
    pub user_agent: Option<String>,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            manifest_load_timeout: Duration::from_secs(15),
            start_level: AUTO_LEVEL,
            abr_default_estimate: 5_000_000,
            user_agent: None,
        }
    }
}

/// A variant stream as the engine sees it
#[derive(Debug, Clone, PartialEq)]
pub struct HlsLevel {
    /// Bits per second
    pub bitrate: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub name: Option<String>,
    pub url: String,
}

/// Engine error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsErrorType {
    Network,
    Media,
    Mux,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HlsEvent {
    ManifestParsed,
    LevelSwitched { level: usize },
    Error {
        fatal: bool,
        kind: HlsErrorType,
        details: String,
    },
}

/// An adaptive HLS engine bound to a media element
pub trait HlsEngine {
    fn load_source(&mut self, url: &str) -> Result<(), BackendError>;
    fn attach_media(&mut self, media: &mut dyn MediaElement) -> Result<(), BackendError>;
    /// Restart manifest/segment loading after a network failure
    fn start_load(&mut self);
    fn recover_media_error(&mut self, media: &mut dyn MediaElement);

    fn levels(&self) -> &[HlsLevel];
    /// Level being played, `AUTO_LEVEL` when none yet
    fn current_level(&self) -> i32;
    /// Switch immediately; `AUTO_LEVEL` re-enables automatic selection
    fn set_current_level(&mut self, level: i32, media: &mut dyn MediaElement);
    /// Level to use from the next load on
    fn set_next_level(&mut self, level: i32);
    fn auto_level_enabled(&self) -> bool;

    fn poll_events(&mut self, media: &mut dyn MediaElement) -> Vec<HlsEvent>;
    /// Stop all loading and release buffers. Must not return before the
    /// engine is inert.
    fn destroy(&mut self, media: &mut dyn MediaElement);
}

pub struct HlsAdapter {
    engine: Box<dyn HlsEngine>,
    levels: Vec<QualityLevel>,
    selection: QualitySelection,
}

impl HlsAdapter {
    pub fn attach(
        engines: &dyn EngineFactory,
        media: &mut dyn MediaElement,
        url: &str,
        config: &HlsConfig,
    ) -> Result<Self, BackendError> {
        let mut engine = engines.create_hls(config)?;
        let attached = engine
            .load_source(url)
            .and_then(|()| engine.attach_media(media));
        if let Err(e) = attached {
            engine.destroy(media);
            return Err(e);
        }
        Ok(Self {
            engine,
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

    /// Apply both the current and next level so already fetched data for the
    /// old level does not stall the switch.
    pub fn set_quality(&mut self, selection: QualitySelection, media: &mut dyn MediaElement) -> bool {
        if let QualitySelection::Level(i) = selection {
            if i >= self.levels.len() {
                warn!("Ignoring HLS level {} (only {} levels)", i, self.levels.len());
                return false;
            }
        }
        let index = selection.to_index();
        self.engine.set_current_level(index, media);
        self.engine.set_next_level(index);
        self.selection = selection;
        true
    }

    pub fn restart_load(&mut self) {
        self.engine.start_load();
    }

    pub fn recover_media(&mut self, media: &mut dyn MediaElement) {
        self.engine.recover_media_error(media);
    }

    pub fn poll(&mut self, media: &mut dyn MediaElement) -> Vec<BackendSignal> {
        let mut signals = Vec::new();
        for event in self.engine.poll_events(media) {
            match event {
                HlsEvent::ManifestParsed => {
                    self.levels = self
                        .engine
                        .levels()
                        .iter()
                        .enumerate()
                        .map(|(index, level)| QualityLevel {
                            index,
                            height: level.height,
                            bitrate: Some(level.bitrate).filter(|b| *b > 0),
                            name: level.name.clone(),
                        })
                        .collect();
                    debug!("HLS manifest parsed with {} levels", self.levels.len());
                    signals.push(BackendSignal::Ready { levels: self.levels.clone() });
                }
                HlsEvent::LevelSwitched { level } => {
                    signals.push(BackendSignal::QualitySwitched {
                        level: self.levels.get(level).cloned(),
                    });
                }
                HlsEvent::Error { fatal, kind, details } => {
                    signals.push(BackendSignal::Error(translate_error(fatal, kind, details)));
                }
            }
        }
        signals
    }

    pub fn destroy(mut self, media: &mut dyn MediaElement) {
        self.engine.destroy(media);
        self.levels.clear();
    }
}

fn translate_error(fatal: bool, kind: HlsErrorType, details: String) -> BackendError {
    let class = match kind {
        HlsErrorType::Network => ErrorClass::Network,
        HlsErrorType::Media => ErrorClass::Media,
        HlsErrorType::Mux | HlsErrorType::Other => ErrorClass::Other,
    };
    BackendError { fatal, class, message: details }
}
