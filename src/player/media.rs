//! Media output element abstraction
//!
//! The session controller drives a single media element: it sets the source,
//! issues play/pause/seek commands, and listens for element events. Events are
//! delivered through [`EventSink`]s handed to `add_listener`; every sink is
//! stamped with the session generation that registered it so the controller
//! can drop anything that arrives after the session changed.

use std::sync::mpsc::Sender;

use super::error::PlayError;

/// Element events the controller subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    Play,
    Pause,
    TimeUpdate,
    LoadedMetadata,
    VolumeChange,
    Error,
}

impl MediaEventKind {
    /// Every kind a playback session listens to
    pub const SESSION: [MediaEventKind; 6] = [
        MediaEventKind::Play,
        MediaEventKind::Pause,
        MediaEventKind::TimeUpdate,
        MediaEventKind::LoadedMetadata,
        MediaEventKind::VolumeChange,
        MediaEventKind::Error,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    TimeUpdate {
        current_time: f64,
        /// End of the last buffered range, if the element knows it
        buffered_end: Option<f64>,
    },
    LoadedMetadata {
        /// NaN when unknown, infinite for live streams
        duration: f64,
    },
    VolumeChange {
        volume: f32,
        muted: bool,
    },
    Error {
        message: String,
    },
}

impl MediaEvent {
    pub fn kind(&self) -> MediaEventKind {
        match self {
            MediaEvent::Play => MediaEventKind::Play,
            MediaEvent::Pause => MediaEventKind::Pause,
            MediaEvent::TimeUpdate { .. } => MediaEventKind::TimeUpdate,
            MediaEvent::LoadedMetadata { .. } => MediaEventKind::LoadedMetadata,
            MediaEvent::VolumeChange { .. } => MediaEventKind::VolumeChange,
            MediaEvent::Error { .. } => MediaEventKind::Error,
        }
    }
}

/// Answer of `can_play_type`, mirroring the empty / "maybe" / "probably" strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanPlay {
    No,
    Maybe,
    Probably,
}

impl CanPlay {
    pub fn is_playable(self) -> bool {
        self != CanPlay::No
    }
}

/// Handle returned by `add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A media event tagged with the session generation that subscribed to it
#[derive(Debug, Clone)]
pub struct Envelope {
    pub generation: u64,
    pub event: MediaEvent,
}

/// Delivery end of a listener registration
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: Sender<Envelope>,
}

impl EventSink {
    pub fn new(generation: u64, tx: Sender<Envelope>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns false once the controller side is gone
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.tx
            .send(Envelope { generation: self.generation, event })
            .is_ok()
    }
}

/// The video output the player renders into.
///
/// Time values are seconds. `duration()` is NaN before metadata is known and
/// infinite for live streams.
pub trait MediaElement {
    fn can_play_type(&self, mime: &str) -> CanPlay;

    fn src(&self) -> Option<&str>;
    fn set_src(&mut self, url: &str);
    /// Drop the current source and reset the element (`src = ""; load()`)
    fn clear_src(&mut self);
    fn load(&mut self);

    /// Request playback. The element may refuse (autoplay policy) or abort
    /// when a new load supersedes the request.
    fn play(&mut self) -> Result<(), PlayError>;
    fn pause(&mut self);
    fn paused(&self) -> bool;

    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn duration(&self) -> f64;

    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);

    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);

    fn add_listener(&mut self, kind: MediaEventKind, sink: EventSink) -> ListenerId;
    fn remove_listener(&mut self, id: ListenerId);
}
