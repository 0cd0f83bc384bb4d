//! DASH engine: loads the MPD and lists its video representations.
//!
//! In automatic mode the element is given the manifest itself and its
//! demuxer picks the representation. A manual choice plays the
//! representation's own `BaseURL` when it has one.

use tracing::{debug, info, warn};

use super::http;
use super::mpd::{parse_mpd, MpdManifest};
use super::{switch_source, Loader, LoaderPoll};
use crate::player::backend::{DashConfig, DashEngine, DashErrorCode, DashEvent, DashTrack};
use crate::player::{BackendError, MediaElement};

type ManifestResult = Result<MpdManifest, (DashErrorCode, String)>;

pub struct NetDashEngine {
    config: DashConfig,
    user_agent: String,
    url: Option<String>,
    tracks: Vec<DashTrack>,
    /// Addressable file per track, parallel to `tracks`
    media_urls: Vec<Option<String>>,
    quality: Option<usize>,
    auto: bool,
    loader: Option<Loader<ManifestResult>>,
    pending: Vec<DashEvent>,
}

impl NetDashEngine {
    pub fn new(config: DashConfig, user_agent: String) -> Self {
        let auto = config.auto_switch_bitrate;
        Self {
            config,
            user_agent,
            url: None,
            tracks: Vec::new(),
            media_urls: Vec::new(),
            quality: None,
            auto,
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
        debug!("Loading DASH manifest {}", url);

        self.loader = Some(Loader::spawn(move || -> ManifestResult {
            let agent = http::agent(timeout);
            let body = http::fetch_text(&agent, &url, &user_agent)
                .map_err(|e| (DashErrorCode::ManifestLoad, e.to_string()))?;
            parse_mpd(&body, &url).map_err(|e| (DashErrorCode::ManifestParse, e.to_string()))
        }));
    }

    fn play_manifest(&mut self, media: &mut dyn MediaElement) {
        if let Some(url) = self.url.clone() {
            switch_source(media, &url);
        }
    }

    fn on_manifest(&mut self, result: ManifestResult, media: &mut dyn MediaElement) {
        match result {
            Ok(manifest) => {
                info!(
                    "DASH manifest with {} video representations (live: {})",
                    manifest.representations.len(),
                    manifest.dynamic
                );
                self.tracks = manifest
                    .representations
                    .iter()
                    .map(|r| DashTrack {
                        id: r.id.clone(),
                        bandwidth: r.bandwidth,
                        width: r.width,
                        height: r.height,
                    })
                    .collect();
                self.media_urls = manifest.representations.into_iter().map(|r| r.media_url).collect();
                self.pending.push(DashEvent::ManifestLoaded);

                match self.quality.filter(|_| !self.auto) {
                    Some(index) => self.set_quality(index, media),
                    None => self.play_manifest(media),
                }
            }
            Err((code, message)) => {
                warn!("DASH manifest failed ({:?}): {}", code, message);
                self.pending.push(DashEvent::Error { code, message });
            }
        }
    }
}

impl DashEngine for NetDashEngine {
    fn initialize(&mut self, _media: &mut dyn MediaElement, url: &str) -> Result<(), BackendError> {
        url::Url::parse(url).map_err(|e| BackendError::setup(format!("Invalid manifest URL: {}", e)))?;
        self.url = Some(url.to_string());
        self.spawn_loader();
        Ok(())
    }

    fn attach_source(&mut self, url: &str) {
        self.url = Some(url.to_string());
        self.spawn_loader();
    }

    fn bitrate_list(&self) -> &[DashTrack] {
        &self.tracks
    }

    fn quality(&self) -> Option<usize> {
        self.quality
    }

    fn set_quality(&mut self, index: usize, media: &mut dyn MediaElement) {
        let Some(url) = self.media_urls.get(index).cloned() else {
            return;
        };
        self.quality = Some(index);
        match url {
            Some(url) => {
                switch_source(media, &url);
                self.pending.push(DashEvent::QualityChangeRendered { index });
            }
            None => {
                debug!("Representation {} is segment-addressed; the demuxer keeps choosing", index);
                self.play_manifest(media);
            }
        }
    }

    fn auto_switch(&self) -> bool {
        self.auto
    }

    fn set_auto_switch(&mut self, enabled: bool, media: &mut dyn MediaElement) {
        self.auto = enabled;
        if enabled && !self.tracks.is_empty() {
            self.quality = None;
            self.play_manifest(media);
        }
    }

    fn poll_events(&mut self, media: &mut dyn MediaElement) -> Vec<DashEvent> {
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
                self.pending.push(DashEvent::Error {
                    code: DashErrorCode::ManifestLoad,
                    message: "Manifest loader stopped".to_string(),
                });
            }
        }
        std::mem::take(&mut self.pending)
    }

    fn reset(&mut self, _media: &mut dyn MediaElement) {
        self.loader = None;
        self.url = None;
        self.tracks.clear();
        self.media_urls.clear();
        self.quality = None;
        self.pending.clear();
    }
}
