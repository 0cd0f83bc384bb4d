//! Short EPG (now/next programme listings) for live channels
//!
//! Xtream panels answer `get_short_epg` with an `epg_listings` array whose
//! titles and descriptions are base64 encoded.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde_json::Value;

/// Programmes requested per channel
pub const SHORT_EPG_LIMIT: u32 = 4;

/// One programme of a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub title: String,
    pub description: Option<String>,
    /// Start time as Unix timestamp
    pub start: i64,
    /// End time as Unix timestamp
    pub stop: i64,
}

impl Program {
    pub fn is_airing(&self, now: i64) -> bool {
        self.start <= now && now < self.stop
    }

    /// Fraction of the programme already aired
    pub fn progress(&self, now: i64) -> f32 {
        if self.stop <= self.start {
            return 0.0;
        }
        ((now - self.start) as f32 / (self.stop - self.start) as f32).clamp(0.0, 1.0)
    }
}

/// Programme airing at `now` and the one after it. `programs` must be sorted by start.
pub fn now_and_next(programs: &[Program], now: i64) -> (Option<&Program>, Option<&Program>) {
    let idx = programs.partition_point(|p| p.stop <= now);
    match programs.get(idx) {
        Some(p) if p.start <= now => (Some(p), programs.get(idx + 1)),
        upcoming => (None, upcoming),
    }
}

/// Parse a `get_short_epg` response. Entries without usable times are skipped.
pub fn parse_short_epg(json: &Value) -> Vec<Program> {
    let Some(listings) = json.get("epg_listings").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut programs: Vec<Program> = listings
        .iter()
        .filter_map(|item| {
            let start = timestamp(item, "start_timestamp", "start")?;
            let stop = timestamp(item, "stop_timestamp", "end")
                .or_else(|| timestamp(item, "stop_timestamp", "stop"))?;
            if stop <= start {
                return None;
            }
            let title = item.get("title").and_then(Value::as_str).map(decode_text)?;
            let description = item
                .get("description")
                .and_then(Value::as_str)
                .map(decode_text)
                .filter(|d| !d.is_empty());
            Some(Program { title, description, start, stop })
        })
        .collect();

    programs.sort_by_key(|p| p.start);
    programs
}

/// Unix seconds from `ts_key`, else from a "YYYY-MM-DD HH:MM:SS" field in `text_key`
fn timestamp(item: &Value, ts_key: &str, text_key: &str) -> Option<i64> {
    let from_ts = match item.get(ts_key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    from_ts.or_else(|| {
        let text = item.get(text_key)?.as_str()?;
        let naive = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
        Some(naive.and_utc().timestamp())
    })
}

/// Base64 text as sent by most panels; anything that does not decode to UTF-8 is kept as is
fn decode_text(raw: &str) -> String {
    let raw = raw.trim();
    B64.decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
        .trim()
        .to_string()
}

/// Format a Unix timestamp as local time HH:MM
pub fn format_time(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn program(title: &str, start: i64, stop: i64) -> Program {
        Program { title: title.to_string(), description: None, start, stop }
    }

    #[test]
    fn test_parse_short_epg_decodes_base64() {
        let json = json!({
            "epg_listings": [
                {
                    "title": "RXZlbmluZyBOZXdz",
                    "description": "TGF0ZXN0IGhlYWRsaW5lcw==",
                    "start": "2026-01-01 19:00:00",
                    "end": "2026-01-01 19:30:00",
                    "start_timestamp": "1767294000",
                    "stop_timestamp": "1767295800"
                },
                {
                    "title": "Weather",
                    "start": "2026-01-01 18:45:00",
                    "end": "2026-01-01 19:00:00"
                },
                {"title": "Broken", "start_timestamp": "10", "stop_timestamp": "5"},
                {"title": "No times"}
            ]
        });
        let programs = parse_short_epg(&json);
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].title, "Weather");
        assert_eq!(programs[0].start, 1767293100);
        assert_eq!(programs[1].title, "Evening News");
        assert_eq!(programs[1].description.as_deref(), Some("Latest headlines"));
        assert_eq!(programs[1].stop, 1767295800);
    }

    #[test]
    fn test_missing_listings_is_empty() {
        assert!(parse_short_epg(&json!({})).is_empty());
        assert!(parse_short_epg(&json!({"epg_listings": null})).is_empty());
    }

    #[test]
    fn test_now_and_next() {
        let programs = vec![program("A", 100, 200), program("B", 200, 300), program("C", 300, 400)];

        let (now, next) = now_and_next(&programs, 250);
        assert_eq!(now.map(|p| p.title.as_str()), Some("B"));
        assert_eq!(next.map(|p| p.title.as_str()), Some("C"));

        let (now, next) = now_and_next(&programs, 50);
        assert!(now.is_none());
        assert_eq!(next.map(|p| p.title.as_str()), Some("A"));

        let (now, next) = now_and_next(&programs, 400);
        assert!(now.is_none() && next.is_none());

        assert!(programs[1].is_airing(200));
        assert!(!programs[1].is_airing(300));
        assert_eq!(programs[0].progress(150), 0.5);
    }
}
