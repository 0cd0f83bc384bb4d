//! Format resolver: turns a stream descriptor into an ordered list of candidate URLs
//!
//! No I/O happens here. Adaptive manifests (HLS, then DASH) are always tried
//! before single-bitrate files; an explicit direct source short-circuits the
//! list to that one URL.

use crate::models::StreamDescriptor;

use super::error::ResolveError;
use super::types::{CandidateSource, ContainerFormat};

/// Server base and credentials used to build Xtream stream URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XtreamOrigin {
    pub server: String,
    pub username: String,
    pub password: String,
}

impl XtreamOrigin {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            server: server.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// `{server}/{live|movie|series}/{user}/{pass}/{id}.{ext}`
    pub fn stream_url(&self, stream: &StreamDescriptor, extension: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            self.server.trim_end_matches('/'),
            stream.content_type.path_segment(),
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password),
            stream.id,
            extension
        )
    }
}

/// Containers requested from the origin when nothing else is configured
pub const DEFAULT_CONTAINERS: [ContainerFormat; 3] = [
    ContainerFormat::Hls,
    ContainerFormat::MpegTs,
    ContainerFormat::Mp4,
];

#[derive(Debug, Clone)]
pub struct FormatResolver {
    origin: Option<XtreamOrigin>,
    containers: Vec<ContainerFormat>,
}

impl Default for FormatResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FormatResolver {
    pub fn new(origin: Option<XtreamOrigin>) -> Self {
        Self {
            origin,
            containers: DEFAULT_CONTAINERS.to_vec(),
        }
    }

    /// Override the containers requested from the origin. Order is normalised
    /// to adaptive-first when resolving.
    pub fn with_containers(mut self, containers: Vec<ContainerFormat>) -> Self {
        self.containers = containers;
        self
    }

    pub fn origin(&self) -> Option<&XtreamOrigin> {
        self.origin.as_ref()
    }

    pub fn set_origin(&mut self, origin: Option<XtreamOrigin>) {
        self.origin = origin;
    }

    pub fn resolve(&self, stream: &StreamDescriptor) -> Result<Vec<CandidateSource>, ResolveError> {
        if let Some(url) = stream
            .direct_source
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
        {
            return Ok(vec![CandidateSource::new(ContainerFormat::from_url(url), url)]);
        }

        let origin = self.origin.as_ref().ok_or(ResolveError::NoOrigin)?;

        let mut formats: Vec<ContainerFormat> = Vec::new();
        for format in &self.containers {
            // DASH is never served by Xtream origins
            if *format == ContainerFormat::Dash || format.extension().is_none() {
                continue;
            }
            if !formats.contains(format) {
                formats.push(format.clone());
            }
        }

        if !stream.is_live() {
            if let Some(ext) = stream.container_extension.as_deref() {
                let format = ContainerFormat::from_extension(ext);
                if format.extension().is_some() && !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }

        // Stable, so preferred order survives within the same rank
        formats.sort_by_key(ContainerFormat::rank);

        let candidates: Vec<CandidateSource> = formats
            .into_iter()
            .filter_map(|format| {
                let url = origin.stream_url(stream, format.extension()?);
                Some(CandidateSource::new(format, url))
            })
            .collect();

        if candidates.is_empty() {
            return Err(ResolveError::NoCandidates { name: stream.name.clone() });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn origin() -> XtreamOrigin {
        XtreamOrigin::new("http://srv:8080/", "user@mail.com", "p@ss word")
    }

    #[test]
    fn test_direct_m3u8_is_hls_first() {
        let stream = StreamDescriptor::new(1, "News", ContentType::Live)
            .with_direct_source("https://cdn/live/news.m3u8");
        let candidates = FormatResolver::default().resolve(&stream).unwrap();
        assert_eq!(candidates[0].format, ContainerFormat::Hls);
    }

    #[test]
    fn test_direct_mpd_single_candidate() {
        let stream = StreamDescriptor::new(2, "Film", ContentType::Movie)
            .with_direct_source("https://cdn/x.mpd");
        let resolver = FormatResolver::new(Some(origin()));
        let candidates = resolver.resolve(&stream).unwrap();
        assert_eq!(candidates, vec![CandidateSource::new(ContainerFormat::Dash, "https://cdn/x.mpd")]);
    }

    #[test]
    fn test_direct_unknown_extension_is_progressive() {
        let stream = StreamDescriptor::new(3, "Cam", ContentType::Live)
            .with_direct_source("rtsp://10.0.0.2/stream");
        let candidates = FormatResolver::default().resolve(&stream).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].format.is_adaptive());
        assert_eq!(candidates[0].format, ContainerFormat::Other(None));
    }

    #[test]
    fn test_blank_direct_source_uses_origin() {
        let mut stream = StreamDescriptor::new(4, "Ch", ContentType::Live);
        stream.direct_source = Some("   ".to_string());
        let candidates = FormatResolver::new(Some(origin())).resolve(&stream).unwrap();
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_origin_urls_are_encoded() {
        let stream = StreamDescriptor::new(12345, "Sports", ContentType::Live);
        let candidates = FormatResolver::new(Some(origin())).resolve(&stream).unwrap();
        assert_eq!(
            candidates[0].url,
            "http://srv:8080/live/user%40mail.com/p%40ss%20word/12345.m3u8"
        );
        assert_eq!(candidates[1].format, ContainerFormat::MpegTs);
        assert_eq!(candidates[2].format, ContainerFormat::Mp4);
    }

    #[test]
    fn test_adaptive_first_regardless_of_preference() {
        let resolver = FormatResolver::new(Some(origin()))
            .with_containers(vec![ContainerFormat::Mp4, ContainerFormat::MpegTs, ContainerFormat::Hls]);
        let stream = StreamDescriptor::new(1, "Ch", ContentType::Live);
        let formats: Vec<_> = resolver
            .resolve(&stream)
            .unwrap()
            .into_iter()
            .map(|c| c.format)
            .collect();
        assert_eq!(formats, vec![ContainerFormat::Hls, ContainerFormat::MpegTs, ContainerFormat::Mp4]);
    }

    #[test]
    fn test_vod_container_extension_appended_last() {
        let stream = StreamDescriptor::new(77, "Movie", ContentType::Movie).with_container_extension("mkv");
        let candidates = FormatResolver::new(Some(origin())).resolve(&stream).unwrap();
        let last = candidates.last().unwrap();
        assert_eq!(last.format, ContainerFormat::Other(Some("mkv".to_string())));
        assert!(last.url.starts_with("http://srv:8080/movie/"));
        assert!(last.url.ends_with("/77.mkv"));
    }

    #[test]
    fn test_vod_extension_not_duplicated() {
        let stream = StreamDescriptor::new(77, "Movie", ContentType::Series).with_container_extension("MP4");
        let candidates = FormatResolver::new(Some(origin())).resolve(&stream).unwrap();
        assert_eq!(candidates.iter().filter(|c| c.format == ContainerFormat::Mp4).count(), 1);
    }

    #[test]
    fn test_no_origin_is_error() {
        let stream = StreamDescriptor::new(1, "Ch", ContentType::Live);
        assert_eq!(FormatResolver::default().resolve(&stream), Err(ResolveError::NoOrigin));
    }

    #[test]
    fn test_empty_container_list_is_error() {
        let resolver = FormatResolver::new(Some(origin())).with_containers(vec![ContainerFormat::Dash]);
        let stream = StreamDescriptor::new(1, "Ch", ContentType::Live);
        assert!(matches!(resolver.resolve(&stream), Err(ResolveError::NoCandidates { .. })));
    }
}
