//! Xtream Codes API client

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::engine::http::{self, FetchError};
use crate::epg::{self, Program};
use crate::models::{ContentType, ServerInfo, StreamDescriptor, StreamId, UserInfo};
use crate::player::XtreamOrigin;

const API_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid server URL: {0}")]
    InvalidServer(String),

    #[error(transparent)]
    Http(#[from] FetchError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Login failed: invalid username or password")]
    Unauthorized,

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// One row of a live, VOD or series listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: StreamId,
    pub name: String,
    pub content_type: ContentType,
    pub icon: Option<String>,
    pub category_id: Option<String>,
    pub epg_channel_id: Option<String>,
    pub container_extension: Option<String>,
    pub direct_source: Option<String>,
}

impl Listing {
    /// Series rows are containers of episodes, not playable themselves
    pub fn is_playable(&self) -> bool {
        self.content_type != ContentType::Series
    }

    pub fn to_descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            content_type: self.content_type,
            direct_source: self.direct_source.clone(),
            icon: self.icon.clone(),
            container_extension: self.container_extension.clone(),
            category_id: self.category_id.clone(),
            epg_channel_id: self.epg_channel_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub id: StreamId,
    pub title: String,
    pub season: u32,
    pub episode_num: u32,
    pub container_extension: Option<String>,
    pub direct_source: Option<String>,
}

impl Episode {
    pub fn to_descriptor(&self) -> StreamDescriptor {
        let mut stream = StreamDescriptor::new(self.id.clone(), &self.title, ContentType::Series);
        stream.container_extension = self.container_extension.clone();
        stream.direct_source = self.direct_source.clone();
        stream
    }
}

pub struct XtreamClient {
    server: String,
    username: String,
    password: String,
    user_agent: String,
    agent: ureq::Agent,
}

impl XtreamClient {
    pub fn new(server: &str, username: &str, password: &str) -> Self {
        Self {
            server: normalize_server(server),
            username: username.to_string(),
            password: password.to_string(),
            user_agent: http::DEFAULT_USER_AGENT.to_string(),
            agent: http::agent(API_TIMEOUT),
        }
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn origin(&self) -> XtreamOrigin {
        XtreamOrigin::new(&self.server, &self.username, &self.password)
    }

    fn api_url(&self, action: Option<&str>, params: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = url::Url::parse(&format!("{}/player_api.php", self.server))
            .map_err(|e| ApiError::InvalidServer(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("username", &self.username);
            query.append_pair("password", &self.password);
            if let Some(action) = action {
                query.append_pair("action", action);
            }
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }
        Ok(url.into())
    }

    fn get_json(&self, action: Option<&str>, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.api_url(action, params)?;
        debug!("API request: {}", action.unwrap_or("account"));
        let body = http::fetch_text(&self.agent, &url, &self.user_agent)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub fn authenticate(&self) -> Result<(UserInfo, ServerInfo), ApiError> {
        let json = self.get_json(None, &[])?;
        parse_account(&json)
    }

    pub fn categories(&self, kind: ContentType) -> Result<Vec<Category>, ApiError> {
        let action = match kind {
            ContentType::Live => "get_live_categories",
            ContentType::Movie => "get_vod_categories",
            ContentType::Series => "get_series_categories",
        };
        let json = self.get_json(Some(action), &[])?;
        Ok(parse_categories(&json))
    }

    /// Listing of one category, or of everything when `category_id` is None
    pub fn streams(&self, kind: ContentType, category_id: Option<&str>) -> Result<Vec<Listing>, ApiError> {
        let action = match kind {
            ContentType::Live => "get_live_streams",
            ContentType::Movie => "get_vod_streams",
            ContentType::Series => "get_series",
        };
        let params: Vec<(&str, &str)> = category_id.map(|id| ("category_id", id)).into_iter().collect();
        let json = self.get_json(Some(action), &params)?;
        Ok(parse_listings(&json, kind))
    }

    pub fn series_episodes(&self, series_id: &StreamId) -> Result<Vec<Episode>, ApiError> {
        let id = series_id.to_string();
        let json = self.get_json(Some("get_series_info"), &[("series_id", &id)])?;
        Ok(parse_episodes(&json))
    }

    /// Current and upcoming programmes of a live channel
    pub fn short_epg(&self, stream_id: &StreamId, limit: u32) -> Result<Vec<Program>, ApiError> {
        let id = stream_id.to_string();
        let limit = limit.to_string();
        let json = self.get_json(Some("get_short_epg"), &[("stream_id", &id), ("limit", &limit)])?;
        Ok(epg::parse_short_epg(&json))
    }

    /// Case-insensitive name search over a whole content type
    pub fn search(&self, kind: ContentType, query: &str) -> Result<Vec<Listing>, ApiError> {
        let listings = self.streams(kind, None)?;
        Ok(filter_listings(listings, query))
    }
}

fn normalize_server(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn stream_id(value: Option<&Value>) -> Option<StreamId> {
    match value? {
        Value::Number(n) => n.as_i64().map(StreamId::Numeric),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Some(StreamId::Numeric(n)),
            Err(_) if !s.trim().is_empty() => Some(StreamId::Text(s.trim().to_string())),
            Err(_) => None,
        },
        _ => None,
    }
}

fn parse_account(json: &Value) -> Result<(UserInfo, ServerInfo), ApiError> {
    let user = json
        .get("user_info")
        .ok_or_else(|| ApiError::Unexpected("missing user_info".to_string()))?;
    if number(user.get("auth")) != Some(1) {
        return Err(ApiError::Unauthorized);
    }

    let expiry = user
        .get("exp_date")
        .and_then(|v| text(Some(v)))
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unlimited".to_string());

    let user_info = UserInfo {
        username: text(user.get("username")).unwrap_or_default(),
        status: text(user.get("status")).unwrap_or_default(),
        max_connections: text(user.get("max_connections")).unwrap_or_default(),
        active_connections: text(user.get("active_cons")).unwrap_or_default(),
        is_trial: number(user.get("is_trial")) == Some(1),
        expiry,
    };

    let server = json.get("server_info");
    let server_info = ServerInfo {
        url: text(server.and_then(|s| s.get("url"))).unwrap_or_default(),
        port: text(server.and_then(|s| s.get("port"))).unwrap_or_default(),
        timezone: text(server.and_then(|s| s.get("timezone"))).unwrap_or_default(),
    };

    Ok((user_info, server_info))
}

fn parse_categories(json: &Value) -> Vec<Category> {
    json.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Category {
                        id: text(item.get("category_id"))?,
                        name: text(item.get("category_name")).unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_listings(json: &Value, kind: ContentType) -> Vec<Listing> {
    let (id_key, icon_key) = match kind {
        ContentType::Series => ("series_id", "cover"),
        _ => ("stream_id", "stream_icon"),
    };
    json.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Listing {
                        id: stream_id(item.get(id_key))?,
                        name: text(item.get("name")).unwrap_or_default(),
                        content_type: kind,
                        icon: text(item.get(icon_key)),
                        category_id: text(item.get("category_id")),
                        epg_channel_id: text(item.get("epg_channel_id")),
                        container_extension: text(item.get("container_extension")),
                        direct_source: text(item.get("direct_source")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `episodes` is an object keyed by season number
fn parse_episodes(json: &Value) -> Vec<Episode> {
    let Some(seasons) = json.get("episodes").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut episodes: Vec<Episode> = seasons
        .iter()
        .flat_map(|(season_key, items)| {
            let season_from_key = season_key.parse().unwrap_or(0);
            items
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(move |item| {
                    Some(Episode {
                        id: stream_id(item.get("id"))?,
                        title: text(item.get("title")).unwrap_or_default(),
                        season: number(item.get("season")).unwrap_or(season_from_key),
                        episode_num: number(item.get("episode_num")).unwrap_or(0),
                        container_extension: text(item.get("container_extension")),
                        direct_source: text(item.get("direct_source")),
                    })
                })
        })
        .collect();

    episodes.sort_by_key(|e| (e.season, e.episode_num));
    episodes
}

fn filter_listings(listings: Vec<Listing>, query: &str) -> Vec<Listing> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    listings
        .into_iter()
        .filter(|l| l.name.to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_url_encodes_credentials() {
        let client = XtreamClient::new("iptv.example.com:8080/", "al ice", "p&ss");
        let url = client.api_url(Some("get_live_streams"), &[("category_id", "7")]).unwrap();
        assert_eq!(
            url,
            "http://iptv.example.com:8080/player_api.php?username=al+ice&password=p%26ss&action=get_live_streams&category_id=7"
        );
        assert_eq!(client.origin().server, "http://iptv.example.com:8080");

        let epg = client.api_url(Some("get_short_epg"), &[("stream_id", "42"), ("limit", "4")]).unwrap();
        assert!(epg.ends_with("&action=get_short_epg&stream_id=42&limit=4"));
    }

    #[test]
    fn test_parse_account() {
        let json = json!({
            "user_info": {
                "username": "alice", "auth": 1, "status": "Active",
                "exp_date": "1767225600", "is_trial": "0",
                "active_cons": "0", "max_connections": "2"
            },
            "server_info": {"url": "iptv.example.com", "port": "8080", "timezone": "UTC"}
        });
        let (user, server) = parse_account(&json).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.expiry, "2026-01-01");
        assert!(!user.is_trial);
        assert_eq!(server.port, "8080");

        let denied = json!({"user_info": {"auth": 0}});
        assert!(matches!(parse_account(&denied), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_parse_listings_with_mixed_ids() {
        let json = json!([
            {"stream_id": 101, "name": "News HD", "category_id": "3", "stream_icon": "http://img/1.png"},
            {"stream_id": "102", "name": "Sports", "category_id": 3},
            {"name": "no id"}
        ]);
        let listings = parse_listings(&json, ContentType::Live);
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, StreamId::Numeric(101));
        assert_eq!(listings[1].id, StreamId::Numeric(102));
        assert_eq!(listings[1].category_id.as_deref(), Some("3"));

        let descriptor = listings[0].to_descriptor();
        assert!(descriptor.is_live());
        assert_eq!(descriptor.icon.as_deref(), Some("http://img/1.png"));
    }

    #[test]
    fn test_series_rows_are_not_playable() {
        let json = json!([{"series_id": 9, "name": "Drama", "cover": "c.jpg"}]);
        let listings = parse_listings(&json, ContentType::Series);
        assert_eq!(listings[0].id, StreamId::Numeric(9));
        assert_eq!(listings[0].icon.as_deref(), Some("c.jpg"));
        assert!(!listings[0].is_playable());
    }

    #[test]
    fn test_parse_episodes_sorted() {
        let json = json!({
            "episodes": {
                "2": [{"id": "501", "title": "S2E1", "episode_num": 1, "container_extension": "mkv"}],
                "1": [
                    {"id": "402", "title": "S1E2", "episode_num": "2", "season": 1, "container_extension": "mp4"},
                    {"id": "401", "title": "S1E1", "episode_num": 1, "season": 1, "container_extension": "mp4"}
                ]
            }
        });
        let episodes = parse_episodes(&json);
        let titles: Vec<&str> = episodes.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["S1E1", "S1E2", "S2E1"]);
        assert_eq!(episodes[2].season, 2);

        let descriptor = episodes[2].to_descriptor();
        assert_eq!(descriptor.content_type, ContentType::Series);
        assert_eq!(descriptor.container_extension.as_deref(), Some("mkv"));
    }

    #[test]
    fn test_search_filter_is_case_insensitive() {
        let listings = parse_listings(
            &json!([
                {"stream_id": 1, "name": "BBC News"},
                {"stream_id": 2, "name": "Sky Sports"},
                {"stream_id": 3, "name": "news 24"}
            ]),
            ContentType::Live,
        );
        let found = filter_listings(listings.clone(), "  NEWS ");
        assert_eq!(found.len(), 2);
        assert!(filter_listings(listings, " ").is_empty());
    }
}
