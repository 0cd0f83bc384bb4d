// Media element backed by ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use super::http::DEFAULT_USER_AGENT;

use crate::player::{
    CanPlay, EventSink, ListenerId, MediaElement, MediaEvent, MediaEventKind, PlayError,
};

/// Decoded video frame for rendering
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 data
    pub pts: i64,
}

/// Segment length assumed when turning a live buffer into a start segment
const ASSUMED_SEGMENT_SECONDS: u32 = 6;

/// How the decoder opens network inputs
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderOptions {
    pub user_agent: String,
    /// Socket read timeout for segments and progressive files
    pub read_timeout: Duration,
    /// Start live HLS at the newest segment and skip demuxer buffering
    pub low_latency: bool,
    /// How far behind the live edge live HLS starts
    pub live_buffer_seconds: u32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            read_timeout: Duration::from_secs(15),
            low_latency: false,
            live_buffer_seconds: 30,
        }
    }
}

impl DecoderOptions {
    /// Entries for the FFmpeg input dictionary
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let timeout_us = self.read_timeout.as_micros().to_string();
        let live_start_index = if self.low_latency {
            -1
        } else {
            -(self.live_buffer_seconds.div_ceil(ASSUMED_SEGMENT_SECONDS).max(1) as i64)
        };

        let mut entries = vec![
            ("user_agent", self.user_agent.clone()),
            ("reconnect", "1".to_string()),
            ("reconnect_streamed", "1".to_string()),
            ("reconnect_delay_max", "5".to_string()),
            ("timeout", timeout_us.clone()),
            ("rw_timeout", timeout_us),
            ("live_start_index", live_start_index.to_string()),
        ];
        if self.low_latency {
            entries.push(("fflags", "nobuffer".to_string()));
        }
        entries
    }
}

/// Commands to the decode thread
#[derive(Debug, Clone, Copy)]
enum DecoderCommand {
    Stop,
    Pause,
    Resume,
    Seek(f64),
    Rate(f64),
}

/// Messages from the decode thread
#[derive(Debug)]
enum DecoderMessage {
    /// Input opened; NaN or infinite duration for live
    Opened { duration: f64 },
    Position(f64),
    Error(String),
    Finished,
}

#[cfg(feature = "internal-player")]
mod decoder {
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as VideoFrame;

    use super::{DecodedFrame, DecoderCommand, DecoderMessage, DecoderOptions};

    pub const AVAILABLE: bool = true;

    const MAX_READ_ERRORS: u32 = 50;

    pub fn init() {
        if let Err(e) = ffmpeg::init() {
            tracing::error!("FFmpeg init failed: {}", e);
        }
    }

    pub struct DecoderHandle {
        commands: Sender<DecoderCommand>,
        messages: Receiver<DecoderMessage>,
    }

    impl DecoderHandle {
        pub fn spawn(
            url: String,
            options: DecoderOptions,
            paused: bool,
            rate: f64,
            frame: Arc<Mutex<Option<DecodedFrame>>>,
        ) -> Self {
            let (cmd_tx, cmd_rx) = channel();
            let (msg_tx, msg_rx) = channel();
            thread::spawn(move || {
                decode_thread(url, options, paused, rate, frame, cmd_rx, msg_tx);
            });
            Self { commands: cmd_tx, messages: msg_rx }
        }

        pub fn send(&self, command: DecoderCommand) {
            let _ = self.commands.send(command);
        }

        pub fn poll(&self) -> Vec<DecoderMessage> {
            let mut messages = Vec::new();
            loop {
                match self.messages.try_recv() {
                    Ok(msg) => messages.push(msg),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
            messages
        }
    }

    impl Drop for DecoderHandle {
        fn drop(&mut self) {
            let _ = self.commands.send(DecoderCommand::Stop);
        }
    }

    fn fail(msg_tx: &Sender<DecoderMessage>, message: String) {
        let _ = msg_tx.send(DecoderMessage::Error(message));
    }

    fn decode_thread(
        url: String,
        options: DecoderOptions,
        mut paused: bool,
        mut rate: f64,
        current_frame: Arc<Mutex<Option<DecodedFrame>>>,
        cmd_rx: Receiver<DecoderCommand>,
        msg_tx: Sender<DecoderMessage>,
    ) {
        // Set options for network streams
        let mut dictionary = ffmpeg::Dictionary::new();
        for (key, value) in options.entries() {
            dictionary.set(key, &value);
        }

        let mut ictx = match ffmpeg::format::input_with_dictionary(&url, dictionary) {
            Ok(ctx) => ctx,
            Err(e) => return fail(&msg_tx, format!("Failed to open stream: {}", e)),
        };

        let (video_stream_index, time_base, parameters) = match ictx.streams().best(Type::Video) {
            Some(stream) => (stream.index(), f64::from(stream.time_base()), stream.parameters()),
            None => return fail(&msg_tx, "No video stream found".to_string()),
        };

        let mut decoder = match ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|c| c.decoder().video())
        {
            Ok(d) => d,
            Err(e) => return fail(&msg_tx, format!("Failed to create decoder: {}", e)),
        };

        let width = decoder.width();
        let height = decoder.height();

        // Scale to reasonable size if too large
        let (target_width, target_height) = if width > 1280 || height > 720 {
            let scale = f64::min(1280.0 / width as f64, 720.0 / height as f64);
            ((width as f64 * scale) as u32, (height as f64 * scale) as u32)
        } else {
            (width, height)
        };

        let mut scaler = match ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            target_width,
            target_height,
            Flags::BILINEAR,
        ) {
            Ok(s) => s,
            Err(e) => return fail(&msg_tx, format!("Failed to create scaler: {}", e)),
        };

        let duration = match ictx.duration() {
            d if d > 0 => d as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE),
            _ => f64::INFINITY,
        };
        let _ = msg_tx.send(DecoderMessage::Opened { duration });

        let base_frame_duration = Duration::from_secs_f64(1.0 / 30.0); // Target 30fps display
        let mut last_frame_time = Instant::now();
        let mut read_errors = 0u32;

        loop {
            // Check for commands
            loop {
                match cmd_rx.try_recv() {
                    Ok(DecoderCommand::Stop) | Err(TryRecvError::Disconnected) => return,
                    Ok(DecoderCommand::Pause) => paused = true,
                    Ok(DecoderCommand::Resume) => paused = false,
                    Ok(DecoderCommand::Rate(r)) => rate = r,
                    Ok(DecoderCommand::Seek(seconds)) => {
                        let ts = (seconds * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
                        match ictx.seek(ts, ..ts) {
                            Ok(()) => decoder.flush(),
                            Err(e) => tracing::warn!("Seek to {:.1}s failed: {}", seconds, e),
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            if paused {
                thread::sleep(Duration::from_millis(50));
                continue;
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut ictx) {
                Ok(()) => read_errors = 0,
                Err(ffmpeg::Error::Eof) => break,
                Err(e) => {
                    read_errors += 1;
                    if read_errors >= MAX_READ_ERRORS {
                        return fail(&msg_tx, format!("Stream read failed: {}", e));
                    }
                    tracing::debug!("Packet read error: {}", e);
                    continue;
                }
            }

            // Only process video packets
            if packet.stream() != video_stream_index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }

            let mut decoded = VideoFrame::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = VideoFrame::empty();
                if scaler.run(&decoded, &mut rgb_frame).is_err() {
                    continue;
                }

                // Copy frame data (handling stride)
                let data = rgb_frame.data(0);
                let stride = rgb_frame.stride(0);
                let mut frame_data = Vec::with_capacity((target_width * target_height * 3) as usize);
                for y in 0..target_height as usize {
                    let row_start = y * stride;
                    let row_end = row_start + (target_width as usize * 3);
                    frame_data.extend_from_slice(&data[row_start..row_end]);
                }

                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
                if let Ok(mut slot) = current_frame.lock() {
                    *slot = Some(DecodedFrame {
                        width: target_width,
                        height: target_height,
                        data: frame_data,
                        pts,
                    });
                }
                let _ = msg_tx.send(DecoderMessage::Position(pts as f64 * time_base));

                // Pace display by playback rate
                let frame_duration = base_frame_duration.div_f64(rate.max(0.1));
                let elapsed = last_frame_time.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
                last_frame_time = Instant::now();
            }
        }

        let _ = msg_tx.send(DecoderMessage::Finished);
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod decoder {
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    use super::{DecodedFrame, DecoderCommand, DecoderMessage, DecoderOptions};

    pub const AVAILABLE: bool = false;

    pub fn init() {}

    pub struct DecoderHandle {
        reported: RefCell<bool>,
    }

    impl DecoderHandle {
        pub fn spawn(
            _url: String,
            _options: DecoderOptions,
            _paused: bool,
            _rate: f64,
            _frame: Arc<Mutex<Option<DecodedFrame>>>,
        ) -> Self {
            Self { reported: RefCell::new(false) }
        }

        pub fn send(&self, _command: DecoderCommand) {}

        pub fn poll(&self) -> Vec<DecoderMessage> {
            if self.reported.replace(true) {
                return Vec::new();
            }
            vec![DecoderMessage::Error(
                "Internal player not enabled. Build with --features internal-player".to_string(),
            )]
        }
    }
}

use decoder::DecoderHandle;

/// Video output element decoding through FFmpeg on a background thread.
///
/// Events for registered listeners are produced by [`FfmpegMedia::pump`],
/// which the window calls once per frame, and synchronously by the
/// play/pause/volume setters.
pub struct FfmpegMedia {
    options: DecoderOptions,
    src: Option<String>,
    paused: bool,
    current_time: f64,
    duration: f64,
    volume: f32,
    muted: bool,
    playback_rate: f64,
    listeners: Vec<(ListenerId, MediaEventKind, EventSink)>,
    next_listener: u64,
    decoder: Option<DecoderHandle>,
    frame: Arc<Mutex<Option<DecodedFrame>>>,
}

impl FfmpegMedia {
    pub fn new(options: DecoderOptions) -> Self {
        decoder::init();
        Self {
            options,
            src: None,
            paused: true,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            listeners: Vec::new(),
            next_listener: 0,
            decoder: None,
            frame: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether this build can decode anything at all
    pub fn decoding_available() -> bool {
        decoder::AVAILABLE
    }

    /// Takes effect from the next load
    pub fn set_options(&mut self, options: DecoderOptions) {
        self.options = options;
    }

    /// Take the latest decoded frame
    pub fn take_frame(&self) -> Option<DecodedFrame> {
        self.frame.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Deliver decode-thread progress to listeners
    pub fn pump(&mut self) {
        let messages = match self.decoder.as_ref() {
            Some(decoder) => decoder.poll(),
            None => return,
        };
        for message in messages {
            match message {
                DecoderMessage::Opened { duration } => {
                    debug!("Media opened (duration {})", duration);
                    self.duration = duration;
                    self.emit(MediaEvent::LoadedMetadata { duration });
                }
                DecoderMessage::Position(seconds) => {
                    self.current_time = seconds;
                    self.emit(MediaEvent::TimeUpdate { current_time: seconds, buffered_end: None });
                }
                DecoderMessage::Error(message) => {
                    warn!("Media error: {}", message);
                    self.decoder = None;
                    self.emit(MediaEvent::Error { message });
                }
                DecoderMessage::Finished => {
                    self.decoder = None;
                    if !self.paused {
                        self.paused = true;
                        self.emit(MediaEvent::Pause);
                    }
                }
            }
        }
    }

    /// Whether a decode thread is running
    pub fn is_loading_or_playing(&self) -> bool {
        self.decoder.is_some()
    }

    fn emit(&self, event: MediaEvent) {
        let kind = event.kind();
        for (_, k, sink) in &self.listeners {
            if *k == kind {
                sink.emit(event.clone());
            }
        }
    }

    fn stop_decoder(&mut self) {
        self.decoder = None;
        if let Ok(mut slot) = self.frame.lock() {
            *slot = None;
        }
    }

    fn start_decoder(&mut self) {
        self.stop_decoder();
        if let Some(url) = self.src.clone() {
            self.decoder = Some(DecoderHandle::spawn(
                url,
                self.options.clone(),
                self.paused,
                self.playback_rate,
                Arc::clone(&self.frame),
            ));
        }
    }
}

impl MediaElement for FfmpegMedia {
    fn can_play_type(&self, mime: &str) -> CanPlay {
        if !decoder::AVAILABLE {
            return CanPlay::No;
        }
        match mime {
            "video/mp2t" | "video/mp4" => CanPlay::Probably,
            "application/vnd.apple.mpegurl" | "application/dash+xml" => CanPlay::Maybe,
            _ => CanPlay::No,
        }
    }

    fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn set_src(&mut self, url: &str) {
        self.stop_decoder();
        self.src = Some(url.to_string());
        self.current_time = 0.0;
        self.duration = f64::NAN;
    }

    fn clear_src(&mut self) {
        self.stop_decoder();
        self.src = None;
        self.current_time = 0.0;
        self.duration = f64::NAN;
    }

    fn load(&mut self) {
        self.start_decoder();
    }

    fn play(&mut self) -> Result<(), PlayError> {
        if self.src.is_none() {
            return Err(PlayError::Failed("No source".to_string()));
        }
        if self.decoder.is_none() {
            self.start_decoder();
        }
        if self.paused {
            self.paused = false;
            if let Some(decoder) = self.decoder.as_ref() {
                decoder.send(DecoderCommand::Resume);
            }
            self.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            if let Some(decoder) = self.decoder.as_ref() {
                decoder.send(DecoderCommand::Pause);
            }
            self.emit(MediaEvent::Pause);
        }
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        if let Some(decoder) = self.decoder.as_ref() {
            decoder.send(DecoderCommand::Seek(seconds));
        }
        self.current_time = seconds;
        self.emit(MediaEvent::TimeUpdate { current_time: seconds, buffered_end: None });
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.emit(MediaEvent::VolumeChange { volume: self.volume, muted: self.muted });
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.emit(MediaEvent::VolumeChange { volume: self.volume, muted });
    }

    fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
        if let Some(decoder) = self.decoder.as_ref() {
            decoder.send(DecoderCommand::Rate(rate));
        }
    }

    fn add_listener(&mut self, kind: MediaEventKind, sink: EventSink) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, kind, sink));
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _, _)| *lid != id);
    }
}

impl Drop for FfmpegMedia {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_listeners_receive_matching_events() {
        let mut media = FfmpegMedia::new(DecoderOptions::default());
        let (tx, rx) = channel();
        let volume = media.add_listener(MediaEventKind::VolumeChange, EventSink::new(3, tx.clone()));
        media.add_listener(MediaEventKind::Pause, EventSink::new(3, tx));

        media.set_volume(1.5);
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.generation, 3);
        assert_eq!(envelope.event, MediaEvent::VolumeChange { volume: 1.0, muted: false });
        assert!(rx.try_recv().is_err());

        media.remove_listener(volume);
        media.set_muted(true);
        assert!(rx.try_recv().is_err());
        assert!(media.muted());
    }

    #[test]
    fn test_decoder_options_entries() {
        let options = DecoderOptions {
            user_agent: "VLC/3.0.20 LibVLC/3.0.20".to_string(),
            read_timeout: Duration::from_secs(20),
            low_latency: false,
            live_buffer_seconds: 30,
        };
        let entries = options.entries();
        let get = |key: &str| entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("user_agent"), Some("VLC/3.0.20 LibVLC/3.0.20"));
        assert_eq!(get("timeout"), Some("20000000"));
        assert_eq!(get("rw_timeout"), Some("20000000"));
        assert_eq!(get("live_start_index"), Some("-5"));
        assert_eq!(get("fflags"), None);

        let low_latency = DecoderOptions { low_latency: true, ..options.clone() };
        let entries = low_latency.entries();
        let get = |key: &str| entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("live_start_index"), Some("-1"));
        assert_eq!(get("fflags"), Some("nobuffer"));

        let short = DecoderOptions { live_buffer_seconds: 0, ..options };
        assert!(short.entries().contains(&("live_start_index", "-1".to_string())));
    }

    #[test]
    fn test_play_without_source_fails() {
        let mut media = FfmpegMedia::new(DecoderOptions::default());
        assert!(matches!(media.play(), Err(PlayError::Failed(_))));
        assert!(media.paused());
    }

    #[test]
    fn test_clear_src_resets_timing() {
        let mut media = FfmpegMedia::new(DecoderOptions::default());
        media.set_src("http://example.com/live/u/p/1.ts");
        assert_eq!(media.src(), Some("http://example.com/live/u/p/1.ts"));
        media.clear_src();
        assert_eq!(media.src(), None);
        assert!(media.duration().is_nan());
        assert_eq!(media.current_time(), 0.0);
    }
}
