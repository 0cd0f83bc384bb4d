//! Configuration management

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::engine::DecoderOptions;
use crate::player::{ContainerFormat, DashConfig, HlsConfig, SessionConfig};

const APP_DIR: &str = "xtream_player";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ConnectionQuality {
    Fast,
    #[default]
    Normal,
    Slow,
    VerySlow,
    Custom,
}

impl ConnectionQuality {
    pub fn buffer_seconds(&self, custom: u32) -> u32 {
        match self {
            ConnectionQuality::Fast => 10,
            ConnectionQuality::Normal => 30,
            ConnectionQuality::Slow => 60,
            ConnectionQuality::VerySlow => 90,
            ConnectionQuality::Custom => custom,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionQuality::Fast => "Fast",
            ConnectionQuality::Normal => "Normal",
            ConnectionQuality::Slow => "Slow",
            ConnectionQuality::VerySlow => "Very slow",
            ConnectionQuality::Custom => "Custom",
        }
    }
}

pub const USER_AGENTS: [&str; 4] = [
    crate::engine::http::DEFAULT_USER_AGENT,
    "VLC/3.0.20 LibVLC/3.0.20",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "IPTVSmartersPlayer",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Saved login
    #[serde(default)]
    pub saved_server: String,
    #[serde(default)]
    pub saved_username: String,
    #[serde(default)]
    pub saved_password: String,
    #[serde(default)]
    pub auto_login: bool,
    // User agent
    #[serde(default)]
    pub selected_user_agent: usize,
    #[serde(default)]
    pub custom_user_agent: String,
    #[serde(default)]
    pub use_custom_user_agent: bool,
    // Buffering
    #[serde(default)]
    pub connection_quality: ConnectionQuality,
    #[serde(default = "default_buffer")]
    pub buffer_seconds: u32,
    // Playback
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default)]
    pub start_muted: bool,
    /// Extensions requested from the server, most preferred first
    #[serde(default = "default_containers")]
    pub preferred_containers: Vec<String>,
    #[serde(default)]
    pub prefer_native_hls: bool,
    #[serde(default = "default_max_recoveries")]
    pub max_recoveries: u32,
    #[serde(default = "default_true")]
    pub enable_pip: bool,
    // Stream tuning
    /// Start live HLS at the newest segment instead of `buffer_seconds` behind
    #[serde(default)]
    pub hls_low_latency: bool,
    #[serde(default = "default_timeout")]
    pub manifest_timeout_secs: u64,
    /// Read timeout for segments and progressive files
    #[serde(default = "default_timeout")]
    pub fragment_timeout_secs: u64,
    // Appearance
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    /// Favorites as JSON
    #[serde(default)]
    pub favorites_json: String,
}

fn default_buffer() -> u32 { 30 }
fn default_true() -> bool { true }
fn default_max_recoveries() -> u32 { 3 }
fn default_timeout() -> u64 { 15 }
fn default_containers() -> Vec<String> {
    vec!["m3u8".to_string(), "ts".to_string(), "mp4".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            saved_server: String::new(),
            saved_username: String::new(),
            saved_password: String::new(),
            auto_login: false,
            selected_user_agent: 0,
            custom_user_agent: String::new(),
            use_custom_user_agent: false,
            connection_quality: ConnectionQuality::Normal,
            buffer_seconds: default_buffer(),
            autoplay: true,
            start_muted: false,
            preferred_containers: default_containers(),
            prefer_native_hls: false,
            max_recoveries: default_max_recoveries(),
            enable_pip: true,
            hls_low_latency: false,
            manifest_timeout_secs: default_timeout(),
            fragment_timeout_secs: default_timeout(),
            dark_mode: true,
            favorites_json: String::new(),
        }
    }
}

fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    fs::create_dir_all(&path).ok();
    path
}

impl AppConfig {
    fn config_path() -> PathBuf {
        app_dir().join("config.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring unreadable config {}: {}", path.display(), e),
                }
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        self.save_to(&Self::config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = fs::write(path, content) {
                warn!("Failed to save config to {}: {}", path.display(), e);
            }
        }
    }

    pub fn user_agent(&self) -> String {
        if self.use_custom_user_agent && !self.custom_user_agent.trim().is_empty() {
            self.custom_user_agent.trim().to_string()
        } else {
            USER_AGENTS
                .get(self.selected_user_agent)
                .unwrap_or(&USER_AGENTS[0])
                .to_string()
        }
    }

    pub fn effective_buffer_seconds(&self) -> u32 {
        self.connection_quality.buffer_seconds(self.buffer_seconds)
    }

    /// Options for the decoder that opens segments and files
    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            user_agent: self.user_agent(),
            read_timeout: Duration::from_secs(self.fragment_timeout_secs.max(1)),
            low_latency: self.hls_low_latency,
            live_buffer_seconds: self.effective_buffer_seconds(),
        }
    }

    pub fn containers(&self) -> Vec<ContainerFormat> {
        let containers: Vec<ContainerFormat> = self
            .preferred_containers
            .iter()
            .map(|ext| ContainerFormat::from_extension(ext))
            .filter(|f| f.extension().is_some())
            .collect();
        if containers.is_empty() {
            crate::player::resolver::DEFAULT_CONTAINERS.to_vec()
        } else {
            containers
        }
    }

    pub fn to_session_config(&self) -> SessionConfig {
        let user_agent = Some(self.user_agent());
        SessionConfig {
            autoplay: self.autoplay,
            prefer_native_hls: self.prefer_native_hls,
            max_recoveries: self.max_recoveries,
            picture_in_picture: self.enable_pip,
            hls: HlsConfig {
                manifest_load_timeout: Duration::from_secs(self.manifest_timeout_secs.max(1)),
                user_agent: user_agent.clone(),
                ..HlsConfig::default()
            },
            dash: DashConfig {
                manifest_load_timeout: Duration::from_secs(self.manifest_timeout_secs.max(1)),
                user_agent,
                ..DashConfig::default()
            },
        }
    }
}

/// Small key/value store persisted as one JSON object, the desktop stand-in
/// for browser local storage
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl LocalStore {
    pub fn open_default() -> Self {
        Self::open(app_dir().join("local_storage.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let values = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Map<String, Value>>(&content).ok())
            .unwrap_or_default();
        Self { path, values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.flush();
    }

    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }

    fn flush(&self) {
        match serde_json::to_string_pretty(&self.values) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    warn!("Failed to write {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialise local storage: {}", e),
        }
    }
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("xtream_player_{}_{}_{}", std::process::id(), n, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"saved_server": "http://a.example"}"#).unwrap();
        assert_eq!(config.saved_server, "http://a.example");
        assert!(config.autoplay);
        assert_eq!(config.max_recoveries, 3);
        assert_eq!(config.preferred_containers, vec!["m3u8", "ts", "mp4"]);
    }

    #[test]
    fn test_session_config_from_settings() {
        let config = AppConfig {
            connection_quality: ConnectionQuality::Slow,
            prefer_native_hls: true,
            max_recoveries: 5,
            enable_pip: false,
            manifest_timeout_secs: 0,
            use_custom_user_agent: true,
            custom_user_agent: " MyBox/1.0 ".to_string(),
            ..AppConfig::default()
        };
        let session = config.to_session_config();
        assert!(session.prefer_native_hls);
        assert_eq!(session.max_recoveries, 5);
        assert!(!session.picture_in_picture);
        assert_eq!(session.hls.manifest_load_timeout, Duration::from_secs(1));
        assert_eq!(session.hls.user_agent.as_deref(), Some("MyBox/1.0"));
        assert_eq!(session.dash.user_agent.as_deref(), Some("MyBox/1.0"));
    }

    #[test]
    fn test_decoder_options_from_settings() {
        let config = AppConfig {
            connection_quality: ConnectionQuality::Slow,
            fragment_timeout_secs: 20,
            ..AppConfig::default()
        };
        let options = config.decoder_options();
        assert_eq!(options.read_timeout, Duration::from_secs(20));
        assert_eq!(options.live_buffer_seconds, 60);
        assert!(!options.low_latency);
        assert_eq!(options.user_agent, USER_AGENTS[0]);

        let fast = AppConfig { hls_low_latency: true, fragment_timeout_secs: 0, ..AppConfig::default() };
        let options = fast.decoder_options();
        assert!(options.low_latency);
        assert_eq!(options.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_containers_ignore_unusable_entries() {
        let config = AppConfig {
            preferred_containers: vec!["mp4".to_string(), "".to_string()],
            ..AppConfig::default()
        };
        assert_eq!(config.containers(), vec![ContainerFormat::Mp4]);

        let empty = AppConfig { preferred_containers: Vec::new(), ..AppConfig::default() };
        assert_eq!(empty.containers().len(), 3);
    }

    #[test]
    fn test_config_save_and_load() {
        let path = temp_path("config.json");
        let config = AppConfig { saved_username: "alice".to_string(), start_muted: true, ..AppConfig::default() };
        config.save_to(&path);

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.saved_username, "alice");
        assert!(loaded.start_muted);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_local_store_persists() {
        let path = temp_path("store.json");
        let mut store = LocalStore::open(path.clone());
        assert!(store.get("k").is_none());
        store.set("k", Value::from("v"));

        let reopened = LocalStore::open(path.clone());
        assert_eq!(reopened.get("k"), Some(&Value::from("v")));

        store.remove("k");
        assert!(LocalStore::open(path.clone()).get("k").is_none());
        fs::remove_file(&path).ok();
    }
}
