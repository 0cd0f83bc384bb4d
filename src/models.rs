//! Data models for Xtream Player

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI Tab selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Live,
    Movies,
    Series,
    Favorites,
    Search,
    Console,
}

impl Tab {
    /// Content type browsed by this tab, if any
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            Tab::Live => Some(ContentType::Live),
            Tab::Movies => Some(ContentType::Movie),
            Tab::Series => Some(ContentType::Series),
            Tab::Favorites | Tab::Search | Tab::Console => None,
        }
    }
}

/// Xtream content category; also the first path segment of stream URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Live,
    Movie,
    Series,
}

impl ContentType {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ContentType::Live => "live",
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Live => "Live TV",
            ContentType::Movie => "Movies",
            ContentType::Series => "Series",
        }
    }
}

/// Stream identifier; Xtream panels return either numbers or strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamId::Numeric(id) => write!(f, "{}", id),
            StreamId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for StreamId {
    fn from(id: i64) -> Self {
        StreamId::Numeric(id)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        StreamId::Text(id.to_string())
    }
}

/// Playable content handed to the player.
///
/// A descriptor is never mutated once it is given to a playback session;
/// selecting a different one restarts the session from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: StreamId,
    pub name: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub direct_source: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// File extension for VOD and series items (e.g. "mkv")
    #[serde(default)]
    pub container_extension: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub epg_channel_id: Option<String>,
}

impl StreamDescriptor {
    pub fn new(id: impl Into<StreamId>, name: &str, content_type: ContentType) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            content_type,
            direct_source: None,
            icon: None,
            container_extension: None,
            category_id: None,
            epg_channel_id: None,
        }
    }

    pub fn with_direct_source(mut self, url: &str) -> Self {
        self.direct_source = Some(url.to_string());
        self
    }

    pub fn with_container_extension(mut self, ext: &str) -> Self {
        self.container_extension = Some(ext.to_string());
        self
    }

    pub fn is_live(&self) -> bool {
        self.content_type == ContentType::Live
    }
}

/// User account information
#[derive(Debug, Clone, Default)]
pub struct UserInfo {
    pub username: String,
    pub status: String,
    pub max_connections: String,
    pub active_connections: String,
    pub is_trial: bool,
    pub expiry: String,
}

/// Server information
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub url: String,
    pub port: String,
    pub timezone: String,
}
