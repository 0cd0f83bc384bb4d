//! DASH MPD parsing - video representations only

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

use super::http::resolve_url;

#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub id: String,
    /// Bits per second
    pub bandwidth: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codecs: Option<String>,
    /// Absolute URL when the representation is a single addressable file
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MpdManifest {
    /// `type="dynamic"` (live)
    pub dynamic: bool,
    /// Seconds, from `mediaPresentationDuration`
    pub duration: Option<f64>,
    /// Video representations in document order
    pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MpdError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("Document is not an MPD")]
    NotMpd,

    #[error("Manifest has no video representations")]
    NoVideo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scope {
    Root,
    Mpd,
    Period,
    AdaptationSet,
    Representation,
}

#[derive(Default)]
struct AdaptationSet {
    video: Option<bool>,
    base: Option<String>,
}

/// Parse an MPD fetched from `manifest_url`
pub fn parse_mpd(xml: &str, manifest_url: &str) -> Result<MpdManifest, MpdError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut manifest = MpdManifest { dynamic: false, duration: None, representations: Vec::new() };
    let mut seen_mpd = false;
    let mut scope = Scope::Root;
    let mut mpd_base: Option<String> = None;
    let mut period_base: Option<String> = None;
    let mut set = AdaptationSet::default();
    let mut current: Option<(Representation, Option<bool>, Option<String>)> = None;
    let mut in_base_url = false;
    let mut text_buf = String::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"MPD" => {
                    seen_mpd = true;
                    scope = Scope::Mpd;
                    read_mpd_attrs(e, &mut manifest);
                }
                b"Period" => {
                    scope = Scope::Period;
                    period_base = None;
                }
                b"AdaptationSet" => {
                    scope = Scope::AdaptationSet;
                    set = AdaptationSet { video: is_video(e), base: None };
                }
                b"Representation" => {
                    scope = Scope::Representation;
                    current = Some((representation(e), is_video(e), None));
                }
                b"BaseURL" => {
                    in_base_url = true;
                    text_buf.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"MPD" => {
                    seen_mpd = true;
                    read_mpd_attrs(e, &mut manifest);
                }
                b"Representation" => {
                    let rep = representation(e);
                    if is_video(e).or(set.video).unwrap_or(rep.height.is_some()) {
                        manifest.representations.push(rep);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_base_url => {
                text_buf.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) if in_base_url => {
                text_buf.push_str(entity(&String::from_utf8_lossy(e.as_ref())));
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"BaseURL" => {
                    in_base_url = false;
                    let value = decode_entities(text_buf.trim());
                    if !value.is_empty() {
                        match scope {
                            Scope::Mpd => mpd_base = Some(value),
                            Scope::Period => period_base = Some(value),
                            Scope::AdaptationSet => set.base = Some(value),
                            Scope::Representation => {
                                if let Some((_, _, base)) = current.as_mut() {
                                    *base = Some(value);
                                }
                            }
                            Scope::Root => {}
                        }
                    }
                }
                b"Representation" => {
                    if let Some((mut rep, video, base)) = current.take() {
                        if video.or(set.video).unwrap_or(rep.height.is_some()) {
                            rep.media_url = base.map(|own| {
                                let mut url = manifest_url.to_string();
                                for outer in [&mpd_base, &period_base, &set.base].into_iter().flatten() {
                                    url = resolve_url(&url, outer);
                                }
                                resolve_url(&url, &own)
                            });
                            manifest.representations.push(rep);
                        }
                    }
                    scope = Scope::AdaptationSet;
                }
                b"AdaptationSet" => scope = Scope::Period,
                b"Period" => scope = Scope::Mpd,
                b"MPD" => scope = Scope::Root,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MpdError::Xml { position: position as u64, message: e.to_string() });
            }
            _ => {}
        }
    }

    if !seen_mpd {
        return Err(MpdError::NotMpd);
    }
    if manifest.representations.is_empty() {
        return Err(MpdError::NoVideo);
    }
    Ok(manifest)
}

fn read_mpd_attrs(e: &BytesStart, manifest: &mut MpdManifest) {
    manifest.dynamic = get_attribute(e, b"type").as_deref() == Some("dynamic");
    manifest.duration = get_attribute(e, b"mediaPresentationDuration")
        .and_then(|d| parse_iso_duration(&d));
}

fn representation(e: &BytesStart) -> Representation {
    Representation {
        id: get_attribute(e, b"id").unwrap_or_default(),
        bandwidth: get_attribute(e, b"bandwidth")
            .and_then(|b| b.parse().ok())
            .unwrap_or(0),
        width: get_attribute(e, b"width").and_then(|w| w.parse().ok()),
        height: get_attribute(e, b"height").and_then(|h| h.parse().ok()),
        codecs: get_attribute(e, b"codecs"),
        media_url: None,
    }
}

/// `Some(true)` for video, `Some(false)` for audio/text, `None` when the
/// element does not say
fn is_video(e: &BytesStart) -> Option<bool> {
    if let Some(content) = get_attribute(e, b"contentType") {
        return Some(content == "video");
    }
    get_attribute(e, b"mimeType").map(|mime| mime.starts_with("video/"))
}

fn get_attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            let raw = String::from_utf8(attr.value.as_ref().to_vec()).ok()?;
            return Some(decode_entities(&raw));
        }
    }
    None
}

fn entity(name: &str) -> &'static str {
    match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => "",
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// ISO 8601 duration as used by MPDs: `PT1H2M3.5S`, `P1DT2H`
pub fn parse_iso_duration(value: &str) -> Option<f64> {
    let rest = value.trim().strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };

    let mut total = 0.0;
    let mut number = String::new();
    for c in date.chars() {
        match c {
            'D' => {
                total += number.parse::<f64>().ok()? * 86_400.0;
                number.clear();
            }
            c if c.is_ascii_digit() || c == '.' => number.push(c),
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }
    for c in time.chars() {
        let unit = match c {
            'H' => 3600.0,
            'M' => 60.0,
            'S' => 1.0,
            c if c.is_ascii_digit() || c == '.' => {
                number.push(c);
                continue;
            }
            _ => return None,
        };
        total += number.parse::<f64>().ok()? * unit;
        number.clear();
    }
    if !number.is_empty() {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST_URL: &str = "https://cdn.example.com/vod/concert/manifest.mpd";

    #[test]
    fn test_parse_iso_duration() {
        assert_eq!(parse_iso_duration("PT1H2M3.5S"), Some(3723.5));
        assert_eq!(parse_iso_duration("PT30S"), Some(30.0));
        assert_eq!(parse_iso_duration("P1DT2H"), Some(93_600.0));
        assert_eq!(parse_iso_duration("1H"), None);
        assert_eq!(parse_iso_duration("PT5X"), None);
    }

    #[test]
    fn test_parse_video_representations() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" mediaPresentationDuration="PT10M">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <Representation id="v480" bandwidth="1200000" width="854" height="480" codecs="avc1.4d401e">
        <BaseURL>video/480.mp4</BaseURL>
      </Representation>
      <Representation id="v720" bandwidth="3000000" width="1280" height="720"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <Representation id="a1" bandwidth="128000"><BaseURL>audio.mp4</BaseURL></Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;
        let manifest = parse_mpd(xml, MANIFEST_URL).unwrap();

        assert!(!manifest.dynamic);
        assert_eq!(manifest.duration, Some(600.0));
        assert_eq!(manifest.representations.len(), 2);
        assert_eq!(manifest.representations[0].id, "v480");
        assert_eq!(manifest.representations[0].height, Some(480));
        assert_eq!(
            manifest.representations[0].media_url.as_deref(),
            Some("https://cdn.example.com/vod/concert/video/480.mp4")
        );
        assert_eq!(manifest.representations[1].bandwidth, 3_000_000);
        assert_eq!(manifest.representations[1].media_url, None);
    }

    #[test]
    fn test_nested_base_urls() {
        let xml = r#"<MPD type="dynamic">
  <BaseURL>https://edge.example.net/live/</BaseURL>
  <Period>
    <AdaptationSet contentType="video">
      <BaseURL>hd/</BaseURL>
      <Representation id="1" bandwidth="4000000" height="1080">
        <BaseURL>stream.mp4?sig=a&amp;exp=1</BaseURL>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;
        let manifest = parse_mpd(xml, MANIFEST_URL).unwrap();
        assert!(manifest.dynamic);
        assert_eq!(
            manifest.representations[0].media_url.as_deref(),
            Some("https://edge.example.net/live/hd/stream.mp4?sig=a&exp=1")
        );
    }

    #[test]
    fn test_rejects_documents_without_video() {
        assert_eq!(parse_mpd("<playlist/>", MANIFEST_URL), Err(MpdError::NotMpd));
        let audio_only = r#"<MPD><Period><AdaptationSet mimeType="audio/mp4">
            <Representation id="a" bandwidth="96000"/></AdaptationSet></Period></MPD>"#;
        assert_eq!(parse_mpd(audio_only, MANIFEST_URL), Err(MpdError::NoVideo));
    }
}
