use anyhow::{anyhow, Context};
use log::warn;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use crate::{
    artwork::{DEFAULT_CACHE_CAPACITY, DEFAULT_FETCH_TIMEOUT},
    color::{Palette, Rgb},
    engine::{
        ThemeSettings, DEFAULT_ART_SIZE, DEFAULT_BLUR_RADIUS, DEFAULT_DIM_FACTOR,
        DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH,
    },
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub display: DisplayConfig,
    pub theme: ThemeSettings,
    pub artwork: ArtworkConfig,
    pub player: PlayerConfig,
    pub session: SessionConfig,
    /// File the config was read from, if any.
    pub source: Option<PathBuf>,
}

impl Config {
    /// Looks for a config file next to the working directory and the
    /// executable; falls back to defaults when none exists.
    pub fn load() -> anyhow::Result<Self> {
        for path in candidate_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&data)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(data: &str) -> anyhow::Result<Self> {
        let doc: ConfigDocument = toml::from_str(data)?;
        Ok(doc.into())
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(current_dir) = env::current_dir() {
        candidates.push(current_dir.join("config.toml"));
        candidates.push(current_dir.join("config").join("config.toml"));
        candidates.push(current_dir.join("config").join("nowplaying.toml"));
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("config.toml"));
            candidates.push(dir.join("config").join("config.toml"));
            candidates.push(dir.join("config").join("nowplaying.toml"));
        }
    }

    candidates
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub fullscreen: bool,
    pub always_on_top: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fullscreen: true,
            always_on_top: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkConfig {
    pub fetch_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub name: Option<String>,
    pub poll_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Commands run around playback. Empty means disabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    pub inhibit_command: Vec<String>,
    pub workspace_command: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    display: DisplaySection,
    #[serde(default)]
    theme: ThemeSection,
    #[serde(default)]
    artwork: ArtworkSection,
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    session: SessionSection,
}

#[derive(Debug, Default, Deserialize)]
struct DisplaySection {
    width: Option<u32>,
    height: Option<u32>,
    art_size: Option<u32>,
    fullscreen: Option<bool>,
    always_on_top: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ThemeSection {
    blur_radius: Option<f32>,
    dim_factor: Option<f32>,
    placeholder_background: Option<String>,
    placeholder_artwork: Option<String>,
    default_palette: Option<[String; 3]>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtworkSection {
    fetch_timeout_secs: Option<f32>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSection {
    name: Option<String>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionSection {
    inhibit_command: Option<Vec<String>>,
    workspace_command: Option<Vec<String>>,
}

fn color_or(value: Option<&String>, fallback: Rgb, key: &str) -> Rgb {
    match value {
        Some(raw) => Rgb::from_hex(raw).unwrap_or_else(|| {
            warn!("{key}: invalid color {raw:?}; using {}", fallback.to_hex());
            fallback
        }),
        None => fallback,
    }
}

impl From<ConfigDocument> for Config {
    fn from(value: ConfigDocument) -> Self {
        let defaults = ThemeSettings::default();

        let fallback = defaults.default_palette;
        let default_palette = match value.theme.default_palette.as_ref() {
            Some([strong, medium, base]) => Palette {
                strong: color_or(Some(strong), fallback.strong, "default_palette[0]"),
                medium: color_or(Some(medium), fallback.medium, "default_palette[1]"),
                base: color_or(Some(base), fallback.base, "default_palette[2]"),
            },
            None => fallback,
        };

        let theme = ThemeSettings {
            display_width: value.display.width.unwrap_or(DEFAULT_DISPLAY_WIDTH).max(1),
            display_height: value.display.height.unwrap_or(DEFAULT_DISPLAY_HEIGHT).max(1),
            art_size: value.display.art_size.unwrap_or(DEFAULT_ART_SIZE).max(1),
            blur_radius: value
                .theme
                .blur_radius
                .unwrap_or(DEFAULT_BLUR_RADIUS)
                .max(0.0),
            dim_factor: value
                .theme
                .dim_factor
                .unwrap_or(DEFAULT_DIM_FACTOR)
                .clamp(0.0, 1.0),
            placeholder_background: color_or(
                value.theme.placeholder_background.as_ref(),
                defaults.placeholder_background,
                "placeholder_background",
            ),
            placeholder_artwork: color_or(
                value.theme.placeholder_artwork.as_ref(),
                defaults.placeholder_artwork,
                "placeholder_artwork",
            ),
            default_palette,
        };

        let display = DisplayConfig {
            fullscreen: value.display.fullscreen.unwrap_or(true),
            always_on_top: value.display.always_on_top.unwrap_or(true),
        };

        let artwork = ArtworkConfig {
            fetch_timeout: value
                .artwork
                .fetch_timeout_secs
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f32)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
            cache_capacity: value
                .artwork
                .cache_capacity
                .unwrap_or(DEFAULT_CACHE_CAPACITY)
                .max(1),
        };

        let player = PlayerConfig {
            name: value.player.name.filter(|name| !name.trim().is_empty()),
            poll_interval: value
                .player
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL)
                .max(MIN_POLL_INTERVAL),
        };

        let session = SessionConfig {
            inhibit_command: value.session.inhibit_command.unwrap_or_default(),
            workspace_command: value.session.workspace_command.unwrap_or_default(),
        };

        Config {
            display,
            theme,
            artwork,
            player,
            session,
            source: None,
        }
    }
}

/// Reloads the config file whenever it changes on disk.
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    changes_rx: Receiver<notify::Result<notify::Event>>,
}

impl ConfigWatcher {
    pub fn watch(path: &Path) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.exists() {
            return Err(anyhow!("Config directory {} does not exist", parent.display()));
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        // Editors often replace the file, so watch the directory.
        watcher.watch(parent, RecursiveMode::NonRecursive)?;

        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
            changes_rx: rx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains pending events; returns the reloaded config if the watched
    /// file changed and parsed cleanly.
    pub fn poll(&self) -> Option<Config> {
        let mut relevant = false;
        while let Ok(event) = self.changes_rx.try_recv() {
            match event {
                Ok(evt) => {
                    let file_name = self.path.file_name();
                    if evt.paths.iter().any(|p| p.file_name() == file_name) {
                        relevant = true;
                    }
                }
                Err(err) => warn!("Config watcher error: {err}"),
            }
        }

        if !relevant {
            return None;
        }

        match Config::load_from(&self.path) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!("Ignoring config change: {err:#}");
                None
            }
        }
    }
}
