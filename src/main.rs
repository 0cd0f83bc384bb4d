//! Xtream Player
//! IPTV client for Xtream Codes servers with adaptive HLS/DASH playback

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod engine;
mod epg;
mod favorites;
mod models;
mod player;
mod player_window;
mod search_history;

use api::{Category, Episode, Listing, XtreamClient};
use config::{AppConfig, ConnectionQuality, LocalStore, USER_AGENTS};
use epg::Program;
use favorites::{Favorite, FavoriteKind, Favorites};
use models::{ContentType, ServerInfo, StreamDescriptor, StreamId, Tab, UserInfo};
use player_window::PlayerWindow;
use search_history::RecentSearches;

const MAX_LOG_LINES: usize = 500;

/// Get current local time as HH:MM:SS
fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Background task messages
enum TaskResult {
    LoggedIn {
        user_info: UserInfo,
        server_info: ServerInfo,
        categories: HashMap<ContentType, Vec<Category>>,
    },
    ListingsLoaded(Vec<Listing>),
    EpisodesLoaded(Vec<Episode>),
    SearchResults {
        query: String,
        results: Vec<Listing>,
    },
    EpgLoaded {
        stream_id: StreamId,
        programs: Vec<Program>,
    },
    /// EPG is optional, so this never touches the loading state
    EpgFailed(String),
    Error(String),
}

/// Context for background fetch operations - avoids cloning credentials repeatedly
struct FetchContext {
    server: String,
    username: String,
    password: String,
    user_agent: String,
    sender: Sender<TaskResult>,
}

impl FetchContext {
    fn client(&self) -> XtreamClient {
        XtreamClient::new(&self.server, &self.username, &self.password).with_user_agent(&self.user_agent)
    }

    fn send(&self, result: TaskResult) {
        let _ = self.sender.send(result);
    }
}

/// Small star toggle shown before a row; returns true when clicked
fn star_button(ui: &mut egui::Ui, is_favorite: bool) -> bool {
    let (icon, hint) = if is_favorite { ("★", "Remove from favorites") } else { ("☆", "Add to favorites") };
    ui.small_button(icon).on_hover_text(hint).clicked()
}

#[derive(Debug, Clone, PartialEq)]
enum NavigationLevel {
    Categories,
    Listings(String),
    Episodes(String),
}

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1250.0, 700.0])
            .with_min_inner_size([400.0, 250.0]),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "Xtream Player",
        options,
        Box::new(|cc| {
            let mut fonts = egui::FontDefinitions::default();

            // Try common emoji font paths for the transport bar glyphs
            let emoji_paths = [
                "C:\\Windows\\Fonts\\seguiemj.ttf",
                "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
                "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/System/Library/Fonts/Apple Color Emoji.ttc",
            ];
            for path in emoji_paths {
                if let Ok(font_data) = std::fs::read(path) {
                    fonts
                        .font_data
                        .insert("emoji".to_owned(), egui::FontData::from_owned(font_data).into());
                    fonts
                        .families
                        .entry(egui::FontFamily::Proportional)
                        .or_default()
                        .push("emoji".to_owned());
                    break;
                }
            }
            cc.egui_ctx.set_fonts(fonts);

            let app = IPTVApp::new();
            cc.egui_ctx.set_visuals(if app.config.dark_mode {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            Ok(Box::new(app))
        }),
    )
}

struct IPTVApp {
    // Login fields
    server: String,
    username: String,
    password: String,
    remember: bool,

    // State
    logged_in: bool,
    loading: bool,
    status_message: String,
    config: AppConfig,
    show_settings: bool,
    current_tab: Tab,
    user_info: UserInfo,
    server_info: ServerInfo,

    // Browsing
    categories: HashMap<ContentType, Vec<Category>>,
    navigation_stack: Vec<NavigationLevel>,
    current_listings: Vec<Listing>,
    current_episodes: Vec<Episode>,
    filter: String,

    // Search
    search_query: String,
    search_kind: ContentType,
    search_results: Vec<Listing>,
    recent_searches: RecentSearches,

    favorites: Favorites,

    player: PlayerWindow,
    console_log: Vec<String>,

    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,
}

impl IPTVApp {
    fn new() -> Self {
        let config = AppConfig::load();
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            server: config.saved_server.clone(),
            username: config.saved_username.clone(),
            password: config.saved_password.clone(),
            remember: !config.saved_server.is_empty(),
            logged_in: false,
            loading: false,
            status_message: String::new(),
            show_settings: false,
            current_tab: Tab::Live,
            user_info: UserInfo::default(),
            server_info: ServerInfo::default(),
            categories: HashMap::new(),
            navigation_stack: vec![NavigationLevel::Categories],
            current_listings: Vec::new(),
            current_episodes: Vec::new(),
            filter: String::new(),
            search_query: String::new(),
            search_kind: ContentType::Live,
            search_results: Vec::new(),
            recent_searches: RecentSearches::new(LocalStore::open_default()),
            favorites: Favorites::from_json(&config.favorites_json),
            player: PlayerWindow::new(&config),
            console_log: Vec::new(),
            task_sender,
            task_receiver,
            config,
        };

        app.log("[INFO] Xtream Player started");
        if app.config.auto_login && !app.server.is_empty() {
            app.login();
        }
        app
    }

    fn log(&mut self, message: &str) {
        let timestamp = timestamp_now();
        self.console_log.push(format!("[{}] {}", timestamp, message));
        if self.console_log.len() > MAX_LOG_LINES {
            self.console_log.remove(0);
        }
    }

    fn fetch_context(&self) -> FetchContext {
        FetchContext {
            server: self.server.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            user_agent: self.config.user_agent(),
            sender: self.task_sender.clone(),
        }
    }

    fn login(&mut self) {
        if self.server.trim().is_empty() || self.username.is_empty() || self.password.is_empty() {
            self.status_message = "Please fill all fields".to_string();
            return;
        }

        self.status_message = "Logging in...".to_string();
        self.loading = true;
        self.log(&format!("[INFO] Attempting login to {}", self.server));
        self.log(&format!("[INFO] User Agent: {}", self.config.user_agent()));

        let ctx = self.fetch_context();
        thread::spawn(move || {
            let client = ctx.client();
            let (user_info, server_info) = match client.authenticate() {
                Ok(info) => info,
                Err(e) => return ctx.send(TaskResult::Error(format!("Login: {}", e))),
            };

            let mut categories = HashMap::new();
            for kind in [ContentType::Live, ContentType::Movie, ContentType::Series] {
                match client.categories(kind) {
                    Ok(list) => {
                        categories.insert(kind, list);
                    }
                    Err(e) => {
                        return ctx.send(TaskResult::Error(format!("{} categories: {}", kind.label(), e)));
                    }
                }
            }
            ctx.send(TaskResult::LoggedIn { user_info, server_info, categories });
        });
    }

    fn logout(&mut self) {
        self.player.stop();
        self.player.set_origin(None);
        self.logged_in = false;
        self.categories.clear();
        self.current_listings.clear();
        self.current_episodes.clear();
        self.search_results.clear();
        self.navigation_stack = vec![NavigationLevel::Categories];
        self.log("[INFO] Logged out");
    }

    fn fetch_listings(&mut self, kind: ContentType, category: &Category) {
        self.loading = true;
        self.status_message = format!("Loading {}...", category.name);
        self.navigation_stack.push(NavigationLevel::Listings(category.name.clone()));
        self.current_listings.clear();

        let ctx = self.fetch_context();
        let category_id = category.id.clone();
        thread::spawn(move || match ctx.client().streams(kind, Some(&category_id)) {
            Ok(listings) => ctx.send(TaskResult::ListingsLoaded(listings)),
            Err(e) => ctx.send(TaskResult::Error(format!("Failed to load streams: {}", e))),
        });
    }

    fn fetch_episodes(&mut self, series_id: StreamId, name: &str) {
        self.loading = true;
        self.status_message = format!("Loading episodes of {}...", name);
        self.navigation_stack.push(NavigationLevel::Episodes(name.to_string()));
        self.current_episodes.clear();

        let ctx = self.fetch_context();
        thread::spawn(move || match ctx.client().series_episodes(&series_id) {
            Ok(episodes) => ctx.send(TaskResult::EpisodesLoaded(episodes)),
            Err(e) => ctx.send(TaskResult::Error(format!("Failed to load episodes: {}", e))),
        });
    }

    fn fetch_epg(&mut self, stream_id: StreamId) {
        let ctx = self.fetch_context();
        thread::spawn(move || match ctx.client().short_epg(&stream_id, epg::SHORT_EPG_LIMIT) {
            Ok(programs) => ctx.send(TaskResult::EpgLoaded { stream_id, programs }),
            Err(e) => ctx.send(TaskResult::EpgFailed(format!("EPG for stream {}: {}", stream_id, e))),
        });
    }

    fn run_search(&mut self, query: &str) {
        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.recent_searches.add(&query);
        self.search_query = query.clone();
        self.loading = true;
        self.status_message = format!("Searching for \"{}\"...", query);
        self.log(&format!("[INFO] Search {}: {}", self.search_kind.label(), query));

        let ctx = self.fetch_context();
        let kind = self.search_kind;
        thread::spawn(move || match ctx.client().search(kind, &query) {
            Ok(results) => ctx.send(TaskResult::SearchResults { query, results }),
            Err(e) => ctx.send(TaskResult::Error(format!("Search failed: {}", e))),
        });
    }

    fn play(&mut self, stream: StreamDescriptor, channels: Vec<StreamDescriptor>) {
        self.log(&format!("[PLAY] Opening {} ({})", stream.name, stream.content_type.label()));
        self.player.play(stream, channels);
    }

    fn is_favorite(&self, item: &Favorite) -> bool {
        self.favorites.contains(item)
    }

    fn toggle_favorite(&mut self, item: Favorite) {
        let name = item.stream.name.clone();
        if self.favorites.toggle(item) {
            self.status_message = format!("Added '{}' to favorites", name);
        } else {
            self.status_message = format!("Removed '{}' from favorites", name);
        }
        self.config.favorites_json = self.favorites.to_json();
        self.config.save();
    }

    fn open_series(&mut self, series_id: StreamId, name: &str) {
        self.current_tab = Tab::Series;
        self.navigation_stack = vec![NavigationLevel::Categories];
        self.fetch_episodes(series_id, name);
    }

    fn save_config(&mut self) {
        if self.remember {
            self.config.saved_server = self.server.clone();
            self.config.saved_username = self.username.clone();
            self.config.saved_password = self.password.clone();
        } else {
            self.config.saved_server.clear();
            self.config.saved_username.clear();
            self.config.saved_password.clear();
            self.config.auto_login = false;
        }
        self.config.save();
        self.player.apply_config(&self.config);
    }

    fn process_tasks(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::LoggedIn { user_info, server_info, categories } => {
                    let count = |kind| categories.get(&kind).map(Vec::len).unwrap_or(0);
                    self.log(&format!(
                        "[INFO] Login successful - Live: {}, Movies: {}, Series: {} categories",
                        count(ContentType::Live),
                        count(ContentType::Movie),
                        count(ContentType::Series)
                    ));
                    self.log(&format!(
                        "[INFO] User: {} | Status: {} | Expiry: {}",
                        user_info.username, user_info.status, user_info.expiry
                    ));
                    info!("Logged in as {}", user_info.username);
                    self.categories = categories;
                    self.user_info = user_info;
                    self.server_info = server_info;
                    self.player.set_origin(Some(self.fetch_context().client().origin()));
                    self.logged_in = true;
                    self.loading = false;
                    self.status_message = "Logged in successfully".to_string();
                    self.save_config();
                }
                TaskResult::ListingsLoaded(listings) => {
                    self.log(&format!("[INFO] Loaded {} streams", listings.len()));
                    self.status_message = format!("Loaded {} streams", listings.len());
                    self.current_listings = listings;
                    self.loading = false;
                }
                TaskResult::EpisodesLoaded(episodes) => {
                    self.log(&format!("[INFO] Loaded {} episodes", episodes.len()));
                    self.status_message = format!("Loaded {} episodes", episodes.len());
                    self.current_episodes = episodes;
                    self.loading = false;
                }
                TaskResult::SearchResults { query, results } => {
                    self.log(&format!("[INFO] {} results for \"{}\"", results.len(), query));
                    self.status_message = format!("{} results", results.len());
                    self.search_results = results;
                    self.loading = false;
                }
                TaskResult::EpgLoaded { stream_id, programs } => {
                    self.log(&format!("[INFO] EPG: {} programmes for stream {}", programs.len(), stream_id));
                    self.player.set_epg(&stream_id, programs);
                }
                TaskResult::EpgFailed(msg) => {
                    warn!("{}", msg);
                    self.log(&format!("[WARN] {}", msg));
                }
                TaskResult::Error(msg) => {
                    error!("{}", msg);
                    self.log(&format!("[ERROR] {}", msg));
                    self.loading = false;
                    self.status_message = format!("Error: {}", msg);
                }
            }
        }
    }
}

impl eframe::App for IPTVApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        self.process_tasks();

        if !self.logged_in {
            egui::CentralPanel::default().show(ctx, |ui| self.show_login(ui));
            if self.loading {
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            }
            return;
        }

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (tab, label) in [
                    (Tab::Live, "📺 Live"),
                    (Tab::Movies, "🎬 Movies"),
                    (Tab::Series, "📼 Series"),
                    (Tab::Favorites, "⭐ Favorites"),
                    (Tab::Search, "🔍 Search"),
                    (Tab::Console, "🖥 Console"),
                ] {
                    if ui.selectable_label(self.current_tab == tab, label).clicked() && self.current_tab != tab {
                        self.current_tab = tab;
                        self.navigation_stack = vec![NavigationLevel::Categories];
                        self.filter.clear();
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Logout").clicked() {
                        self.logout();
                    }
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    ui.label(egui::RichText::new(&self.user_info.username).weak());
                });
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.loading {
                    ui.spinner();
                }
                ui.label(self.status_message.as_str());
            });
        });

        egui::SidePanel::left("browser")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| match self.current_tab {
                Tab::Live | Tab::Movies | Tab::Series => self.show_browser(ui),
                Tab::Favorites => self.show_favorites_tab(ui),
                Tab::Search => self.show_search_tab(ui),
                Tab::Console => self.show_console_tab(ui),
            });

        egui::CentralPanel::default().show(ctx, |ui| self.player.show(ctx, ui));
        for line in self.player.take_log() {
            self.log(&line);
        }
        if let Some(stream_id) = self.player.take_epg_request() {
            self.fetch_epg(stream_id);
        }

        if self.show_settings {
            self.show_settings_window(ctx);
        }
        if self.loading {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

impl IPTVApp {
    fn show_login(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading("Xtream Player");
            ui.add_space(20.0);
            egui::Grid::new("login_grid").num_columns(2).spacing([10.0, 8.0]).show(ui, |ui| {
                ui.label("Server:");
                ui.add(egui::TextEdit::singleline(&mut self.server).hint_text("http://host:port"));
                ui.end_row();
                ui.label("Username:");
                ui.text_edit_singleline(&mut self.username);
                ui.end_row();
                ui.label("Password:");
                ui.add(egui::TextEdit::singleline(&mut self.password).password(true));
                ui.end_row();
            });
            ui.checkbox(&mut self.remember, "Remember login");
            ui.add_enabled(self.remember, egui::Checkbox::new(&mut self.config.auto_login, "Log in automatically"));
            ui.add_space(10.0);
            ui.add_enabled_ui(!self.loading, |ui| {
                if ui.button("Login").clicked() {
                    self.login();
                }
            });
            if self.loading {
                ui.spinner();
            }
            if !self.status_message.is_empty() {
                ui.label(self.status_message.as_str());
            }
        });
    }

    fn show_browser(&mut self, ui: &mut egui::Ui) {
        let Some(kind) = self.current_tab.content_type() else {
            return;
        };

        ui.horizontal(|ui| {
            if self.navigation_stack.len() > 1 && ui.button("⬅ Back").clicked() {
                self.navigation_stack.pop();
                self.current_episodes.clear();
            }
            let title = match self.navigation_stack.last() {
                Some(NavigationLevel::Listings(name)) | Some(NavigationLevel::Episodes(name)) => name.clone(),
                _ => kind.label().to_string(),
            };
            ui.heading(title);
        });
        ui.add(egui::TextEdit::singleline(&mut self.filter).hint_text("Filter..."));
        ui.separator();

        let filter = self.filter.to_lowercase();
        let visible = |name: &str| filter.is_empty() || name.to_lowercase().contains(&filter);

        let mut open_category: Option<Category> = None;
        let mut open_series: Option<Listing> = None;
        let mut to_play: Option<(StreamDescriptor, Vec<StreamDescriptor>)> = None;
        let mut toggle: Option<Favorite> = None;

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            match self.navigation_stack.last() {
                Some(NavigationLevel::Categories) | None => {
                    for category in self.categories.get(&kind).into_iter().flatten() {
                        if visible(&category.name) && ui.button(category.name.as_str()).clicked() {
                            open_category = Some(category.clone());
                        }
                    }
                }
                Some(NavigationLevel::Listings(_)) => {
                    for listing in &self.current_listings {
                        if !visible(&listing.name) {
                            continue;
                        }
                        ui.horizontal(|ui| {
                            let favorite = Favorite::from_listing(listing);
                            if star_button(ui, self.is_favorite(&favorite)) {
                                toggle = Some(favorite);
                            }
                            if listing.is_playable() {
                                if ui.button(format!("▶ {}", listing.name)).clicked() {
                                    let channels = self
                                        .current_listings
                                        .iter()
                                        .filter(|l| l.is_playable())
                                        .map(Listing::to_descriptor)
                                        .collect();
                                    to_play = Some((listing.to_descriptor(), channels));
                                }
                            } else if ui.button(format!("📁 {}", listing.name)).clicked() {
                                open_series = Some(listing.clone());
                            }
                        });
                    }
                }
                Some(NavigationLevel::Episodes(_)) => {
                    for episode in &self.current_episodes {
                        let label = format!("S{:02}E{:02} {}", episode.season, episode.episode_num, episode.title);
                        if !visible(&label) {
                            continue;
                        }
                        ui.horizontal(|ui| {
                            let favorite = Favorite::stream(episode.to_descriptor());
                            if star_button(ui, self.is_favorite(&favorite)) {
                                toggle = Some(favorite);
                            }
                            if ui.button(format!("▶ {}", label)).clicked() {
                                let channels = self.current_episodes.iter().map(Episode::to_descriptor).collect();
                                to_play = Some((episode.to_descriptor(), channels));
                            }
                        });
                    }
                }
            }
        });

        if let Some(category) = open_category {
            self.fetch_listings(kind, &category);
        }
        if let Some(series) = open_series {
            self.fetch_episodes(series.id, &series.name);
        }
        if let Some((stream, channels)) = to_play {
            self.play(stream, channels);
        }
        if let Some(item) = toggle {
            self.toggle_favorite(item);
        }
    }

    fn show_favorites_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Favorites");
        ui.separator();

        if self.favorites.is_empty() {
            ui.label(egui::RichText::new("Star a channel, movie or series to add it here").weak());
            return;
        }

        let mut to_play: Option<StreamDescriptor> = None;
        let mut open_series: Option<StreamDescriptor> = None;
        let mut remove: Option<Favorite> = None;

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for favorite in self.favorites.items() {
                ui.horizontal(|ui| {
                    if ui.small_button("✖").on_hover_text("Remove from favorites").clicked() {
                        remove = Some(favorite.clone());
                    }
                    let stream = &favorite.stream;
                    match favorite.kind {
                        FavoriteKind::Stream => {
                            let label = format!("▶ {} ({})", stream.name, stream.content_type.label());
                            if ui.button(label).clicked() {
                                to_play = Some(stream.clone());
                            }
                        }
                        FavoriteKind::Series => {
                            if ui.button(format!("📁 {}", stream.name)).clicked() {
                                open_series = Some(stream.clone());
                            }
                        }
                    }
                });
            }
        });

        if let Some(stream) = to_play {
            let channels = self.favorites.streams();
            self.play(stream, channels);
        }
        if let Some(series) = open_series {
            self.open_series(series.id, &series.name);
        }
        if let Some(item) = remove {
            self.toggle_favorite(item);
        }
    }

    fn show_search_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Search");
        let mut submit: Option<String> = None;

        ui.horizontal(|ui| {
            for kind in [ContentType::Live, ContentType::Movie, ContentType::Series] {
                ui.radio_value(&mut self.search_kind, kind, kind.label());
            }
        });
        ui.horizontal(|ui| {
            let response = ui.add(egui::TextEdit::singleline(&mut self.search_query).hint_text("Search..."));
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = Some(self.search_query.clone());
            }
            if ui.button("🔍").clicked() {
                submit = Some(self.search_query.clone());
            }
        });

        if !self.recent_searches.terms().is_empty() {
            ui.horizontal_wrapped(|ui| {
                ui.label(egui::RichText::new("Recent:").weak());
                for term in self.recent_searches.terms() {
                    if ui.small_button(term.as_str()).clicked() {
                        submit = Some(term.clone());
                    }
                }
                if ui.small_button("✖ Clear").clicked() {
                    self.recent_searches.clear();
                }
            });
        }
        ui.separator();

        let mut to_play: Option<(StreamDescriptor, Vec<StreamDescriptor>)> = None;
        let mut open_series: Option<Listing> = None;
        let mut toggle: Option<Favorite> = None;
        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for listing in &self.search_results {
                ui.horizontal(|ui| {
                    let favorite = Favorite::from_listing(listing);
                    if star_button(ui, self.is_favorite(&favorite)) {
                        toggle = Some(favorite);
                    }
                    if listing.is_playable() {
                        if ui.button(format!("▶ {}", listing.name)).clicked() {
                            let channels = self.search_results.iter().map(Listing::to_descriptor).collect();
                            to_play = Some((listing.to_descriptor(), channels));
                        }
                    } else if ui.button(format!("📁 {}", listing.name)).clicked() {
                        open_series = Some(listing.clone());
                    }
                });
            }
        });

        if let Some(query) = submit {
            self.run_search(&query);
        }
        if let Some((stream, channels)) = to_play {
            self.play(stream, channels);
        }
        if let Some(series) = open_series {
            self.open_series(series.id, &series.name);
        }
        if let Some(item) = toggle {
            self.toggle_favorite(item);
        }
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        // Display log entries with monospace font
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else if line.contains("[PLAY]") {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::GRAY
                    };

                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        let mut open = true;
        let mut save = false;

        egui::Window::new("Settings").open(&mut open).resizable(false).show(ctx, |ui| {
            let config = &mut self.config;
            ui.heading("Playback");
            ui.checkbox(&mut config.autoplay, "Start playback automatically");
            ui.checkbox(&mut config.start_muted, "Start muted");
            ui.checkbox(&mut config.prefer_native_hls, "Prefer native HLS playback");
            ui.checkbox(&mut config.enable_pip, "Enable picture-in-picture");
            ui.horizontal(|ui| {
                ui.label("Recoveries per error type:");
                ui.add(egui::DragValue::new(&mut config.max_recoveries).range(0..=10));
            });
            ui.horizontal(|ui| {
                ui.label("Preferred formats:");
                let mut formats = config.preferred_containers.join(", ");
                if ui.text_edit_singleline(&mut formats).changed() {
                    config.preferred_containers = formats
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
            });

            ui.separator();
            ui.heading("Buffering");
            egui::ComboBox::from_label("Connection")
                .selected_text(config.connection_quality.label())
                .show_ui(ui, |ui| {
                    for quality in [
                        ConnectionQuality::Fast,
                        ConnectionQuality::Normal,
                        ConnectionQuality::Slow,
                        ConnectionQuality::VerySlow,
                        ConnectionQuality::Custom,
                    ] {
                        ui.selectable_value(&mut config.connection_quality, quality, quality.label());
                    }
                });
            if config.connection_quality == ConnectionQuality::Custom {
                ui.add(egui::Slider::new(&mut config.buffer_seconds, 5..=120).text("seconds"));
            }
            ui.checkbox(&mut config.hls_low_latency, "Low-latency live HLS (start at the live edge)");
            ui.add(egui::Slider::new(&mut config.manifest_timeout_secs, 5..=60).text("manifest timeout (s)"));
            ui.add(egui::Slider::new(&mut config.fragment_timeout_secs, 5..=60).text("fragment timeout (s)"));

            ui.separator();
            ui.heading("Network");
            egui::ComboBox::from_label("User agent")
                .selected_text(USER_AGENTS.get(config.selected_user_agent).copied().unwrap_or(USER_AGENTS[0]))
                .width(300.0)
                .show_ui(ui, |ui| {
                    for (i, agent) in USER_AGENTS.iter().enumerate() {
                        ui.selectable_value(&mut config.selected_user_agent, i, *agent);
                    }
                });
            ui.checkbox(&mut config.use_custom_user_agent, "Custom user agent");
            if config.use_custom_user_agent {
                ui.text_edit_singleline(&mut config.custom_user_agent);
            }

            ui.separator();
            if ui.checkbox(&mut config.dark_mode, "Dark mode").changed() {
                ctx.set_visuals(if config.dark_mode { egui::Visuals::dark() } else { egui::Visuals::light() });
            }
            if ui.button("💾 Save").clicked() {
                save = true;
            }
        });

        if save {
            self.save_config();
            self.log("[INFO] Settings saved");
        }
        if !open || save {
            self.show_settings = false;
        }
    }
}
