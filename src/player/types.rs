//! Shared playback types: container formats, candidate sources, quality levels

use std::fmt;

/// Container or manifest format of a candidate URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// HLS manifest (.m3u8)
    Hls,
    /// MPEG-DASH manifest (.mpd)
    Dash,
    /// MPEG transport stream (.ts)
    MpegTs,
    /// MP4 file (.mp4, .m4v)
    Mp4,
    /// Anything else, played progressively. Holds the lowercase extension, if any.
    Other(Option<String>),
}

impl ContainerFormat {
    /// Infer format from a URL's path extension (query and fragment ignored)
    pub fn from_url(url: &str) -> Self {
        let path = url
            .split(['?', '#'])
            .next()
            .unwrap_or(url);
        // Skip scheme and authority so a host name is never read as an extension
        let path = match path.split_once("://") {
            Some((_, rest)) => match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => return ContainerFormat::Other(None),
            },
            None => path,
        };
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => ContainerFormat::Other(None),
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "m3u8" | "m3u" => ContainerFormat::Hls,
            "mpd" => ContainerFormat::Dash,
            "ts" => ContainerFormat::MpegTs,
            "mp4" | "m4v" => ContainerFormat::Mp4,
            "" => ContainerFormat::Other(None),
            _ => ContainerFormat::Other(Some(ext)),
        }
    }

    /// File extension used when building origin URLs
    pub fn extension(&self) -> Option<&str> {
        match self {
            ContainerFormat::Hls => Some("m3u8"),
            ContainerFormat::Dash => Some("mpd"),
            ContainerFormat::MpegTs => Some("ts"),
            ContainerFormat::Mp4 => Some("mp4"),
            ContainerFormat::Other(ext) => ext.as_deref(),
        }
    }

    /// MIME type probed against the media element
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ContainerFormat::Hls => Some("application/vnd.apple.mpegurl"),
            ContainerFormat::Dash => Some("application/dash+xml"),
            ContainerFormat::MpegTs => Some("video/mp2t"),
            ContainerFormat::Mp4 => Some("video/mp4"),
            ContainerFormat::Other(_) => None,
        }
    }

    /// Manifest based formats with renditions to choose from
    pub fn is_adaptive(&self) -> bool {
        matches!(self, ContainerFormat::Hls | ContainerFormat::Dash)
    }

    /// Attempt order: HLS, DASH, then single-bitrate files
    pub fn rank(&self) -> u8 {
        match self {
            ContainerFormat::Hls => 0,
            ContainerFormat::Dash => 1,
            ContainerFormat::MpegTs => 2,
            ContainerFormat::Mp4 => 3,
            ContainerFormat::Other(_) => 4,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerFormat::Hls => f.write_str("HLS"),
            ContainerFormat::Dash => f.write_str("DASH"),
            ContainerFormat::MpegTs => f.write_str("MPEG-TS"),
            ContainerFormat::Mp4 => f.write_str("MP4"),
            ContainerFormat::Other(Some(ext)) => write!(f, "{}", ext.to_uppercase()),
            ContainerFormat::Other(None) => f.write_str("direct"),
        }
    }
}

/// One URL the session may try, in resolver order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    pub format: ContainerFormat,
    pub url: String,
}

impl CandidateSource {
    pub fn new(format: ContainerFormat, url: impl Into<String>) -> Self {
        Self { format, url: url.into() }
    }
}

/// Engine level index meaning "let the engine choose"
pub const AUTO_LEVEL: i32 = -1;

/// Quality requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    pub fn from_index(index: i32) -> Self {
        if index < 0 {
            QualitySelection::Auto
        } else {
            QualitySelection::Level(index as usize)
        }
    }

    pub fn to_index(self) -> i32 {
        match self {
            QualitySelection::Auto => AUTO_LEVEL,
            QualitySelection::Level(i) => i as i32,
        }
    }
}

/// A rendition reported by an adaptive backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityLevel {
    pub index: usize,
    pub height: Option<u32>,
    /// Bits per second
    pub bitrate: Option<u64>,
    pub name: Option<String>,
}

impl QualityLevel {
    /// Label such as "720p (2500 kbps)"
    pub fn label(&self) -> String {
        let base = match (self.height, self.bitrate) {
            (Some(h), _) => format!("{}p", h),
            (None, Some(b)) => format!("{} kbps", b / 1000),
            (None, None) => self
                .name
                .clone()
                .unwrap_or_else(|| format!("Level {}", self.index)),
        };
        match (self.height, self.bitrate) {
            (Some(_), Some(b)) => format!("{} ({} kbps)", base, b / 1000),
            _ => base,
        }
    }

    /// Short label used by the status line ("720p" / "2500 kbps")
    pub fn short_label(&self) -> String {
        match (self.height, self.bitrate) {
            (Some(h), _) => format!("{}p", h),
            (None, Some(b)) => format!("{} kbps", b / 1000),
            _ => format!("Level {}", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_url_ignores_query() {
        assert_eq!(ContainerFormat::from_url("http://h/a/b.m3u8?token=1"), ContainerFormat::Hls);
        assert_eq!(ContainerFormat::from_url("https://cdn/x.MPD#t=3"), ContainerFormat::Dash);
        assert_eq!(ContainerFormat::from_url("http://h/live/u/p/1.ts"), ContainerFormat::MpegTs);
        assert_eq!(ContainerFormat::from_url("http://h/movie/u/p/7.mp4"), ContainerFormat::Mp4);
    }

    #[test]
    fn test_format_unknown_extension() {
        assert_eq!(
            ContainerFormat::from_url("http://h/movie/u/p/7.mkv"),
            ContainerFormat::Other(Some("mkv".to_string()))
        );
        assert_eq!(ContainerFormat::from_url("http://h/stream"), ContainerFormat::Other(None));
        // Dots in the host are not an extension
        assert_eq!(ContainerFormat::from_url("http://example.com"), ContainerFormat::Other(None));
    }

    #[test]
    fn test_quality_selection_index() {
        assert_eq!(QualitySelection::from_index(-1), QualitySelection::Auto);
        assert_eq!(QualitySelection::from_index(2), QualitySelection::Level(2));
        assert_eq!(QualitySelection::Level(3).to_index(), 3);
        assert_eq!(QualitySelection::Auto.to_index(), AUTO_LEVEL);
    }

    #[test]
    fn test_quality_labels() {
        let level = QualityLevel { index: 0, height: Some(720), bitrate: Some(2_500_000), name: None };
        assert_eq!(level.label(), "720p (2500 kbps)");
        assert_eq!(level.short_label(), "720p");

        let audio_only = QualityLevel { index: 1, height: None, bitrate: Some(128_000), name: None };
        assert_eq!(audio_only.label(), "128 kbps");
    }
}
