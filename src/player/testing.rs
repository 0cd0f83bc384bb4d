//! In-memory media element and scripted engines for controller tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::backend::{
    DashConfig, DashEngine, DashEvent, DashTrack, EngineFactory, HlsConfig, HlsEngine, HlsEvent,
    HlsLevel,
};
use super::error::{BackendError, PlayError};
use super::media::{CanPlay, EventSink, ListenerId, MediaElement, MediaEvent, MediaEventKind};
use super::resolver::{FormatResolver, XtreamOrigin};
use super::session::{SessionConfig, SessionController};
use super::types::AUTO_LEVEL;

pub const MIME_HLS: &str = "application/vnd.apple.mpegurl";
pub const MIME_TS: &str = "video/mp2t";
pub const MIME_MP4: &str = "video/mp4";

pub struct FakeMedia {
    pub src: Option<String>,
    pub paused: bool,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub muted: bool,
    pub playback_rate: f64,
    pub playable: Vec<&'static str>,
    /// Returned by the next `play()` call
    pub next_play_error: Option<PlayError>,
    pub listeners: Vec<(ListenerId, MediaEventKind, EventSink)>,
    pub added: usize,
    pub removed: usize,
    pub play_calls: usize,
    pub loads: usize,
    pub clears: usize,
    pub sources: Vec<String>,
    next_id: u64,
}

impl FakeMedia {
    /// Plays MPEG-TS and MP4 natively, but not HLS
    pub fn new() -> Self {
        Self {
            src: None,
            paused: true,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            playable: vec![MIME_TS, MIME_MP4],
            next_play_error: None,
            listeners: Vec::new(),
            added: 0,
            removed: 0,
            play_calls: 0,
            loads: 0,
            clears: 0,
            sources: Vec::new(),
            next_id: 0,
        }
    }

    pub fn playing(mut self, mimes: &[&'static str]) -> Self {
        self.playable = mimes.to_vec();
        self
    }

    /// Deliver `event` to every listener registered for its kind
    pub fn fire(&self, event: MediaEvent) {
        for (_, kind, sink) in &self.listeners {
            if *kind == event.kind() {
                sink.emit(event.clone());
            }
        }
    }

    /// Sink of the first listener registered for `kind`
    pub fn sink_for(&self, kind: MediaEventKind) -> Option<EventSink> {
        self.listeners
            .iter()
            .find(|(_, k, _)| *k == kind)
            .map(|(_, _, sink)| sink.clone())
    }
}

impl MediaElement for FakeMedia {
    fn can_play_type(&self, mime: &str) -> CanPlay {
        if self.playable.contains(&mime) {
            CanPlay::Maybe
        } else {
            CanPlay::No
        }
    }

    fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
        self.sources.push(url.to_string());
    }

    fn clear_src(&mut self) {
        self.src = None;
        self.duration = f64::NAN;
        self.current_time = 0.0;
        self.clears += 1;
    }

    fn load(&mut self) {
        self.loads += 1;
    }

    fn play(&mut self) -> Result<(), PlayError> {
        self.play_calls += 1;
        if let Some(e) = self.next_play_error.take() {
            return Err(e);
        }
        if self.paused {
            self.paused = false;
            self.fire(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.fire(MediaEvent::Pause);
        }
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.current_time = seconds;
        self.fire(MediaEvent::TimeUpdate { current_time: seconds, buffered_end: None });
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.fire(MediaEvent::VolumeChange { volume, muted: self.muted });
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.fire(MediaEvent::VolumeChange { volume: self.volume, muted });
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
    }

    fn add_listener(&mut self, kind: MediaEventKind, sink: EventSink) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, kind, sink));
        self.added += 1;
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.removed += 1;
    }
}

/// Calls made on fake engines, plus the events they will report next
#[derive(Default)]
pub struct EngineLog {
    pub hls_created: usize,
    pub hls_destroyed: usize,
    pub hls_sources: Vec<String>,
    pub start_loads: usize,
    pub media_recoveries: usize,
    pub current_levels: Vec<i32>,
    pub next_levels: Vec<i32>,
    pub hls_levels: Vec<HlsLevel>,
    pub hls_events: VecDeque<HlsEvent>,
    pub fail_hls_attach: bool,

    pub dash_created: usize,
    pub dash_resets: usize,
    pub dash_sources: Vec<String>,
    pub dash_tracks: Vec<DashTrack>,
    pub dash_events: VecDeque<DashEvent>,
    pub dash_qualities: Vec<usize>,
    pub dash_auto: Vec<bool>,
}

pub type SharedLog = Rc<RefCell<EngineLog>>;

pub fn shared_log() -> SharedLog {
    Rc::new(RefCell::new(EngineLog::default()))
}

pub struct FakeEngines {
    log: SharedLog,
    hls: bool,
    dash: bool,
}

impl FakeEngines {
    pub fn new(log: &SharedLog) -> Self {
        Self { log: Rc::clone(log), hls: true, dash: true }
    }

    pub fn without_hls(mut self) -> Self {
        self.hls = false;
        self
    }
}

impl EngineFactory for FakeEngines {
    fn hls_supported(&self) -> bool {
        self.hls
    }

    fn dash_supported(&self) -> bool {
        self.dash
    }

    fn create_hls(&self, _config: &HlsConfig) -> Result<Box<dyn HlsEngine>, BackendError> {
        self.log.borrow_mut().hls_created += 1;
        Ok(Box::new(FakeHlsEngine {
            log: Rc::clone(&self.log),
            levels: Vec::new(),
            current: AUTO_LEVEL,
            auto: true,
        }))
    }

    fn create_dash(&self, _config: &DashConfig) -> Result<Box<dyn DashEngine>, BackendError> {
        self.log.borrow_mut().dash_created += 1;
        Ok(Box::new(FakeDashEngine {
            log: Rc::clone(&self.log),
            tracks: Vec::new(),
            quality: None,
            auto: true,
        }))
    }
}

struct FakeHlsEngine {
    log: SharedLog,
    levels: Vec<HlsLevel>,
    current: i32,
    auto: bool,
}

impl HlsEngine for FakeHlsEngine {
    fn load_source(&mut self, url: &str) -> Result<(), BackendError> {
        self.log.borrow_mut().hls_sources.push(url.to_string());
        Ok(())
    }

    fn attach_media(&mut self, _media: &mut dyn MediaElement) -> Result<(), BackendError> {
        if self.log.borrow().fail_hls_attach {
            return Err(BackendError::setup("media source unavailable"));
        }
        Ok(())
    }

    fn start_load(&mut self) {
        self.log.borrow_mut().start_loads += 1;
    }

    fn recover_media_error(&mut self, _media: &mut dyn MediaElement) {
        self.log.borrow_mut().media_recoveries += 1;
    }

    fn levels(&self) -> &[HlsLevel] {
        &self.levels
    }

    fn current_level(&self) -> i32 {
        self.current
    }

    fn set_current_level(&mut self, level: i32, _media: &mut dyn MediaElement) {
        self.current = level;
        self.auto = level == AUTO_LEVEL;
        self.log.borrow_mut().current_levels.push(level);
    }

    fn set_next_level(&mut self, level: i32) {
        self.log.borrow_mut().next_levels.push(level);
    }

    fn auto_level_enabled(&self) -> bool {
        self.auto
    }

    fn poll_events(&mut self, _media: &mut dyn MediaElement) -> Vec<HlsEvent> {
        let events: Vec<HlsEvent> = self.log.borrow_mut().hls_events.drain(..).collect();
        if events.contains(&HlsEvent::ManifestParsed) {
            self.levels = self.log.borrow().hls_levels.clone();
        }
        events
    }

    fn destroy(&mut self, _media: &mut dyn MediaElement) {
        self.log.borrow_mut().hls_destroyed += 1;
    }
}

struct FakeDashEngine {
    log: SharedLog,
    tracks: Vec<DashTrack>,
    quality: Option<usize>,
    auto: bool,
}

impl DashEngine for FakeDashEngine {
    fn initialize(&mut self, _media: &mut dyn MediaElement, url: &str) -> Result<(), BackendError> {
        self.log.borrow_mut().dash_sources.push(url.to_string());
        Ok(())
    }

    fn attach_source(&mut self, url: &str) {
        self.log.borrow_mut().dash_sources.push(url.to_string());
    }

    fn bitrate_list(&self) -> &[DashTrack] {
        &self.tracks
    }

    fn quality(&self) -> Option<usize> {
        self.quality
    }

    fn set_quality(&mut self, index: usize, _media: &mut dyn MediaElement) {
        self.quality = Some(index);
        self.log.borrow_mut().dash_qualities.push(index);
    }

    fn auto_switch(&self) -> bool {
        self.auto
    }

    fn set_auto_switch(&mut self, enabled: bool, _media: &mut dyn MediaElement) {
        self.auto = enabled;
        self.log.borrow_mut().dash_auto.push(enabled);
    }

    fn poll_events(&mut self, _media: &mut dyn MediaElement) -> Vec<DashEvent> {
        let events: Vec<DashEvent> = self.log.borrow_mut().dash_events.drain(..).collect();
        if events.contains(&DashEvent::ManifestLoaded) {
            self.tracks = self.log.borrow().dash_tracks.clone();
        }
        events
    }

    fn reset(&mut self, _media: &mut dyn MediaElement) {
        self.log.borrow_mut().dash_resets += 1;
    }
}

pub fn hls_level(bitrate: u64, height: u32) -> HlsLevel {
    HlsLevel {
        bitrate,
        width: None,
        height: Some(height),
        name: None,
        url: format!("https://cdn.example.com/{}p.m3u8", height),
    }
}

pub fn origin_resolver() -> FormatResolver {
    FormatResolver::new(Some(XtreamOrigin::new("http://iptv.example.com:8080", "alice", "secret")))
}

pub fn controller(media: FakeMedia, engines: FakeEngines, resolver: FormatResolver) -> SessionController<FakeMedia> {
    SessionController::new(media, Box::new(engines), resolver, SessionConfig::default())
}
