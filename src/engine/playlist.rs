//! HLS playlist parsing (master and media playlists)

use std::collections::HashMap;

use thiserror::Error;

use super::http::resolve_url;

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Peak bits per second
    pub bandwidth: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub name: Option<String>,
    pub codecs: Option<String>,
    /// Absolute URL of the variant media playlist
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    /// Variant list; already sorted by bandwidth, lowest first
    Master(Vec<Variant>),
    /// A single rendition with segments
    Media { target_duration: Option<f64>, segments: usize, ended: bool },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaylistError {
    #[error("Not an HLS playlist (missing #EXTM3U)")]
    MissingHeader,

    #[error("Playlist has no variants or segments")]
    Empty,
}

/// Parse a playlist fetched from `base_url`
pub fn parse_playlist(content: &str, base_url: &str) -> Result<Playlist, PlaylistError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());

    match lines.next() {
        Some(first) if first.starts_with("#EXTM3U") => {}
        _ => return Err(PlaylistError::MissingHeader),
    }

    let mut variants = Vec::new();
    let mut pending: Option<HashMap<String, String>> = None;
    let mut segments = 0;
    let mut target_duration = None;
    let mut ended = false;

    for line in lines {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            let mut map = HashMap::new();
            extract_attrs(attrs, &mut map);
            pending = Some(map);
        } else if let Some(value) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = value.trim().parse().ok();
        } else if line.starts_with("#EXTINF:") {
            segments += 1;
        } else if line == "#EXT-X-ENDLIST" {
            ended = true;
        } else if !line.starts_with('#') {
            // URI line; only meaningful right after a STREAM-INF tag
            if let Some(attrs) = pending.take() {
                variants.push(variant_from_attrs(&attrs, resolve_url(base_url, line)));
            }
        }
    }

    if !variants.is_empty() {
        variants.sort_by_key(|v| v.bandwidth);
        return Ok(Playlist::Master(variants));
    }
    if segments > 0 {
        return Ok(Playlist::Media { target_duration, segments, ended });
    }
    Err(PlaylistError::Empty)
}

fn variant_from_attrs(attrs: &HashMap<String, String>, url: String) -> Variant {
    let (width, height) = attrs
        .get("resolution")
        .and_then(|r| r.split_once(['x', 'X']))
        .map(|(w, h)| (w.trim().parse().ok(), h.trim().parse().ok()))
        .unwrap_or((None, None));

    Variant {
        bandwidth: attrs
            .get("bandwidth")
            .or_else(|| attrs.get("average-bandwidth"))
            .and_then(|b| b.parse().ok())
            .unwrap_or(0),
        width,
        height,
        name: attrs.get("name").cloned(),
        codecs: attrs.get("codecs").cloned(),
        url,
    }
}

/// Parse `KEY=VALUE,KEY="quoted, value"` attribute lists; keys are lowercased
fn extract_attrs(info: &str, attrs: &mut HashMap<String, String>) {
    let mut chars = info.chars().peekable();

    while chars.peek().is_some() {
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == ',' {
                chars.next();
            } else {
                break;
            }
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            chars.next();
            if c == '=' {
                break;
            }
            key.push(c);
        }
        let key = key.trim().to_lowercase();

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                value.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }

        if !key.is_empty() {
            attrs.insert(key, value.trim().to_string());
        }
    }
}

/// Highest bandwidth that fits `estimate`, or the lowest one when none
/// does. `bandwidths` must be sorted ascending.
pub fn pick_auto_level(bandwidths: &[u64], estimate: u64) -> Option<usize> {
    if bandwidths.is_empty() {
        return None;
    }
    let fitting = bandwidths.iter().rposition(|b| *b <= estimate);
    Some(fitting.unwrap_or(0))
}

#[cfg(test)]
#[path = "playlist_tests.rs"]
mod tests;
