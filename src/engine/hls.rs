//! HLS engine: loads the master playlist, exposes its variants as levels and
//! hands the chosen variant playlist to the media element.

use tracing::{debug, info, warn};

use super::http;
use super::playlist::{parse_playlist, pick_auto_level, Playlist};
use super::{reload_source, switch_source, Loader, LoaderPoll};
use crate::player::backend::{HlsConfig, HlsEngine, HlsErrorType, HlsEvent, HlsLevel};
use crate::player::types::AUTO_LEVEL;
use crate::player::{BackendError, MediaElement};

enum ManifestResult {
    Loaded(Playlist),
    Failed { kind: HlsErrorType, details: String },
}

pub struct NetHlsEngine {
    config: HlsConfig,
    user_agent: String,
    url: Option<String>,
    attached: bool,
    levels: Vec<HlsLevel>,
    current: i32,
    next: i32,
    auto: bool,
    loader: Option<Loader<ManifestResult>>,
    pending: Vec<HlsEvent>,
}

impl NetHlsEngine {
    pub fn new(config: HlsConfig, user_agent: String) -> Self {
        Self {
            config,
            user_agent,
            url: None,
            attached: false,
            levels: Vec::new(),
            current: AUTO_LEVEL,
            next: AUTO_LEVEL,
            auto: true,
            loader: None,
            pending: Vec::new(),
        }
    }

    fn spawn_loader(&mut self) {
        let Some(url) = self.url.clone() else {
            return;
        };
        let timeout = self.config.manifest_load_timeout;
        let user_agent = self.user_agent.clone();
        debug!("Loading HLS manifest {}", url);

        // Replacing the loader cancels any fetch still in flight
        self.loader = Some(Loader::spawn(move || {
            let agent = http::agent(timeout);
            match http::fetch_text(&agent, &url, &user_agent) {
                Ok(body) => match parse_playlist(&body, &url) {
                    Ok(playlist) => ManifestResult::Loaded(playlist),
                    Err(e) => ManifestResult::Failed {
                        kind: HlsErrorType::Other,
                        details: format!("manifestParsingError: {}", e),
                    },
                },
                Err(e) => ManifestResult::Failed {
                    kind: HlsErrorType::Network,
                    details: format!("manifestLoadError: {}", e),
                },
            }
        }));
    }

    fn valid_level(&self, level: i32) -> Option<usize> {
        usize::try_from(level).ok().filter(|i| *i < self.levels.len())
    }

    fn auto_level(&self) -> Option<usize> {
        let bandwidths: Vec<u64> = self.levels.iter().map(|l| l.bitrate).collect();
        pick_auto_level(&bandwidths, self.config.abr_default_estimate)
    }

    /// Level to load after a (re)load of the manifest
    fn load_level(&self) -> Option<usize> {
        if !self.auto {
            if let Some(i) = self.valid_level(self.next).or_else(|| self.valid_level(self.current)) {
                return Some(i);
            }
        }
        if self.current == AUTO_LEVEL {
            if let Some(i) = self.valid_level(self.config.start_level) {
                return Some(i);
            }
        }
        self.auto_level()
    }

    fn apply_level(&mut self, index: usize, media: &mut dyn MediaElement) {
        self.current = index as i32;
        if self.attached {
            switch_source(media, &self.levels[index].url);
        }
        self.pending.push(HlsEvent::LevelSwitched { level: index });
    }

    fn on_manifest(&mut self, result: ManifestResult, media: &mut dyn MediaElement) {
        match result {
            ManifestResult::Loaded(Playlist::Master(variants)) => {
                self.levels = variants
                    .into_iter()
                    .map(|v| HlsLevel {
                        bitrate: v.bandwidth,
                        width: v.width,
                        height: v.height,
                        name: v.name,
                        url: v.url,
                    })
                    .collect();
                info!("HLS master playlist with {} variants", self.levels.len());
                self.pending.push(HlsEvent::ManifestParsed);
                if let Some(index) = self.load_level() {
                    self.apply_level(index, media);
                }
            }
            ManifestResult::Loaded(Playlist::Media { segments, ended, .. }) => {
                debug!("HLS media playlist with {} segments (ended: {})", segments, ended);
                self.levels.clear();
                if let (true, Some(url)) = (self.attached, self.url.as_deref()) {
                    switch_source(media, url);
                }
                self.pending.push(HlsEvent::ManifestParsed);
            }
            ManifestResult::Failed { kind, details } => {
                warn!("HLS manifest failed: {}", details);
                self.pending.push(HlsEvent::Error { fatal: true, kind, details });
            }
        }
    }
}

impl HlsEngine for NetHlsEngine {
    fn load_source(&mut self, url: &str) -> Result<(), BackendError> {
        url::Url::parse(url).map_err(|e| BackendError::setup(format!("Invalid manifest URL: {}", e)))?;
        self.url = Some(url.to_string());
        self.spawn_loader();
        Ok(())
    }

    fn attach_media(&mut self, _media: &mut dyn MediaElement) -> Result<(), BackendError> {
        if self.url.is_none() {
            return Err(BackendError::setup("No HLS source loaded"));
        }
        self.attached = true;
        Ok(())
    }

    fn start_load(&mut self) {
        self.spawn_loader();
    }

    fn recover_media_error(&mut self, media: &mut dyn MediaElement) {
        if !self.attached {
            return;
        }
        let url = match self.valid_level(self.current) {
            Some(i) => self.levels[i].url.clone(),
            None => match self.url.clone() {
                Some(url) => url,
                None => return,
            },
        };
        debug!("Reloading {} to recover from media error", url);
        reload_source(media, &url);
    }

    fn levels(&self) -> &[HlsLevel] {
        &self.levels
    }

    fn current_level(&self) -> i32 {
        self.current
    }

    fn set_current_level(&mut self, level: i32, media: &mut dyn MediaElement) {
        let target = if level == AUTO_LEVEL {
            self.auto = true;
            self.auto_level()
        } else {
            self.auto = false;
            self.valid_level(level)
        };
        if let Some(index) = target {
            self.apply_level(index, media);
        }
    }

    fn set_next_level(&mut self, level: i32) {
        self.next = level;
    }

    fn auto_level_enabled(&self) -> bool {
        self.auto
    }

    fn poll_events(&mut self, media: &mut dyn MediaElement) -> Vec<HlsEvent> {
        let polled = match self.loader.as_ref() {
            Some(loader) => loader.poll(),
            None => LoaderPoll::Pending,
        };
        match polled {
            LoaderPoll::Pending => {}
            LoaderPoll::Done(result) => {
                self.loader = None;
                self.on_manifest(result, media);
            }
            LoaderPoll::Lost => {
                self.loader = None;
                self.pending.push(HlsEvent::Error {
                    fatal: true,
                    kind: HlsErrorType::Network,
                    details: "manifestLoadError: loader stopped".to_string(),
                });
            }
        }
        std::mem::take(&mut self.pending)
    }

    fn destroy(&mut self, _media: &mut dyn MediaElement) {
        self.loader = None;
        self.url = None;
        self.attached = false;
        self.levels.clear();
        self.pending.clear();
    }
}
