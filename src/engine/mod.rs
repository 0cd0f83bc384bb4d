//! Networked streaming engines
//!
//! The managed HLS and DASH engines fetch and parse manifests on background
//! threads, pick renditions, and point the media element at them. The media
//! element ([`FfmpegMedia`]) does the actual demuxing and decoding.

mod dash;
mod ffmpeg_media;
mod hls;
pub mod http;
pub mod mpd;
pub mod playlist;

pub use dash::NetDashEngine;
pub use ffmpeg_media::{DecodedFrame, DecoderOptions, FfmpegMedia};
pub use hls::NetHlsEngine;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use crate::player::backend::{DashConfig, DashEngine, EngineFactory, HlsConfig, HlsEngine};
use crate::player::{BackendError, MediaElement};

/// Factory handed to the session controller
pub struct NetEngines {
    user_agent: String,
    /// Engines only hand URLs to the element, so they are useless without a decoder
    decoder_available: bool,
}

impl NetEngines {
    pub fn new(user_agent: &str, decoder_available: bool) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            decoder_available,
        }
    }
}

impl EngineFactory for NetEngines {
    fn hls_supported(&self) -> bool {
        self.decoder_available
    }

    fn dash_supported(&self) -> bool {
        self.decoder_available
    }

    fn create_hls(&self, config: &HlsConfig) -> Result<Box<dyn HlsEngine>, BackendError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| self.user_agent.clone());
        Ok(Box::new(NetHlsEngine::new(config.clone(), user_agent)))
    }

    fn create_dash(&self, config: &DashConfig) -> Result<Box<dyn DashEngine>, BackendError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| self.user_agent.clone());
        Ok(Box::new(NetDashEngine::new(config.clone(), user_agent)))
    }
}

pub(crate) enum LoaderPoll<T> {
    Pending,
    Done(T),
    /// Worker exited without a result
    Lost,
}

/// One background fetch. Dropping the loader cancels delivery of its result.
pub(crate) struct Loader<T> {
    cancel: Arc<AtomicBool>,
    rx: Receiver<T>,
}

impl<T: Send + 'static> Loader<T> {
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::clone(&cancel);

        thread::spawn(move || {
            let result = job();
            if !cancelled.load(Ordering::SeqCst) {
                let _ = tx.send(result);
            }
        });

        Self { cancel, rx }
    }

    pub fn poll(&self) -> LoaderPoll<T> {
        match self.rx.try_recv() {
            Ok(result) => LoaderPoll::Done(result),
            Err(TryRecvError::Empty) => LoaderPoll::Pending,
            Err(TryRecvError::Disconnected) => LoaderPoll::Lost,
        }
    }
}

impl<T> Drop for Loader<T> {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Point the element at another rendition, keeping the position for VOD
pub(crate) fn switch_source(media: &mut dyn MediaElement, url: &str) {
    if media.src() == Some(url) {
        return;
    }
    reload_source(media, url);
}

/// Reload `url` even if it is already the element's source
pub(crate) fn reload_source(media: &mut dyn MediaElement, url: &str) {
    let position = media.current_time();
    let resume = media.duration().is_finite() && position > 0.0;
    media.set_src(url);
    media.load();
    if resume {
        media.set_current_time(position);
    }
}
