//! Tests for HLS playlist parsing

use super::*;

const BASE: &str = "https://cdn.example.com/live/news/master.m3u8";

#[test]
fn test_parse_master_playlist() {
    let content = r#"#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720,CODECS="avc1.4d401f,mp4a.40.2",NAME="HD"
720p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
https://edge.example.net/news/1080p.m3u8
"#;
    let Playlist::Master(variants) = parse_playlist(content, BASE).unwrap() else {
        panic!("expected master playlist");
    };

    assert_eq!(variants.len(), 3);
    assert_eq!(variants[0].bandwidth, 800_000);
    assert_eq!(variants[0].height, Some(360));
    assert_eq!(variants[0].url, "https://cdn.example.com/live/news/360p/index.m3u8");
    assert_eq!(variants[1].name, Some("HD".to_string()));
    assert_eq!(variants[1].codecs, Some("avc1.4d401f,mp4a.40.2".to_string()));
    assert_eq!(variants[1].width, Some(1280));
    assert_eq!(variants[2].url, "https://edge.example.net/news/1080p.m3u8");
}

#[test]
fn test_parse_media_playlist() {
    let content = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg1.ts\n#EXTINF:6.0,\nseg2.ts\n#EXT-X-ENDLIST\n";
    assert_eq!(
        parse_playlist(content, BASE).unwrap(),
        Playlist::Media { target_duration: Some(6.0), segments: 2, ended: true }
    );
}

#[test]
fn test_live_media_playlist_has_no_endlist() {
    let content = "#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXTINF:4.0,\n100.ts\n";
    assert!(matches!(
        parse_playlist(content, BASE).unwrap(),
        Playlist::Media { ended: false, .. }
    ));
}

#[test]
fn test_rejects_non_playlists() {
    assert_eq!(parse_playlist("<html>nope</html>", BASE), Err(PlaylistError::MissingHeader));
    assert_eq!(parse_playlist("", BASE), Err(PlaylistError::MissingHeader));
    assert_eq!(parse_playlist("#EXTM3U\n#EXT-X-VERSION:3\n", BASE), Err(PlaylistError::Empty));
}

#[test]
fn test_bom_and_lowercase_resolution() {
    let content = "\u{feff}#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=854x480\nlow.m3u8\n";
    let Playlist::Master(variants) = parse_playlist(content, BASE).unwrap() else {
        panic!("expected master playlist");
    };
    assert_eq!(variants[0].height, Some(480));
}

#[test]
fn test_stream_inf_without_uri_is_dropped() {
    let content = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000000\n#EXT-X-STREAM-INF:BANDWIDTH=2000000\nhigh.m3u8\n";
    let Playlist::Master(variants) = parse_playlist(content, BASE).unwrap() else {
        panic!("expected master playlist");
    };
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].bandwidth, 2_000_000);
}

#[test]
fn test_pick_auto_level() {
    let bandwidths = [800_000, 2_800_000, 5_000_000];

    assert_eq!(pick_auto_level(&bandwidths, 5_000_000), Some(2));
    assert_eq!(pick_auto_level(&bandwidths, 3_000_000), Some(1));
    assert_eq!(pick_auto_level(&bandwidths, 100_000), Some(0));
    assert_eq!(pick_auto_level(&[], 5_000_000), None);
}
