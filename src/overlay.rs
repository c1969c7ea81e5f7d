use std::time::{Duration, Instant};

use anyhow::anyhow;
use eframe::egui::{
    self, Align, Color32, ColorImage, CornerRadius, FontId, Layout, Pos2, Rect, RichText,
    TextureHandle, TextureOptions, UiBuilder, ViewportBuilder, ViewportCommand, WindowLevel,
};
use log::{info, warn};
use now_playing_overlay::{
    config::ConfigWatcher,
    metadata::format_length,
    player::Playerctl,
    Config, HttpArtworkSource, Palette, PollUpdate, Poller, Rgb, ThemeImage, ThemeResult, TrackMetadata,
};

const MARGIN: f32 = 60.0;
const COLUMN_SPACING: f32 = 60.0;
const LINE_SPACING: f32 = 10.0;
const TITLE_SIZE: f32 = 40.0;
const ARTIST_SIZE: f32 = 35.0;
const INFO_SIZE: f32 = 30.0;

fn color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}

enum Surface {
    Solid(Color32),
    Texture(TextureHandle),
}

impl Surface {
    fn from_theme_image(ctx: &egui::Context, name: &str, image: &ThemeImage) -> Self {
        match image {
            ThemeImage::Solid { color, .. } => Surface::Solid(color32(*color)),
            ThemeImage::Bitmap(bitmap) => {
                let size = [bitmap.width() as usize, bitmap.height() as usize];
                let color_image = ColorImage::from_rgb(size, bitmap.as_raw());
                Surface::Texture(ctx.load_texture(name, color_image, TextureOptions::LINEAR))
            }
        }
    }

    fn paint(&self, painter: &egui::Painter, rect: Rect) {
        match self {
            Surface::Solid(color) => {
                painter.rect_filled(rect, CornerRadius::same(0), *color);
            }
            Surface::Texture(texture) => {
                painter.image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        }
    }
}

struct OverlayApp {
    poller: Poller<Playerctl, HttpArtworkSource>,
    config: Config,
    watcher: Option<ConfigWatcher>,
    last_poll: Option<Instant>,
    track: TrackMetadata,
    player_available: bool,
    palette: Palette,
    background: Surface,
    artwork: Surface,
}

impl OverlayApp {
    fn new(config: Config, watcher: Option<ConfigWatcher>) -> Self {
        let poller = Poller::new(
            Playerctl::new(config.player.name.clone()),
            HttpArtworkSource::new(config.artwork.fetch_timeout),
            &config,
        );
        Self {
            poller,
            palette: config.theme.default_palette,
            background: Surface::Solid(color32(config.theme.placeholder_background)),
            artwork: Surface::Solid(color32(config.theme.placeholder_artwork)),
            config,
            watcher,
            last_poll: None,
            track: TrackMetadata::no_track(),
            player_available: false,
        }
    }

    fn poll_config(&mut self) {
        let Some(config) = self.watcher.as_ref().and_then(ConfigWatcher::poll) else {
            return;
        };
        if let Some(path) = &config.source {
            info!("Reloaded config from {}", path.display());
        }
        self.apply_config(config);
    }

    fn apply_config(&mut self, config: Config) {
        if config.player.name != self.config.player.name {
            info!(
                "Switching player to {}",
                config.player.name.as_deref().unwrap_or("any")
            );
            self.poller.set_player(Playerctl::new(config.player.name.clone()));
        }
        if config.artwork.fetch_timeout != self.config.artwork.fetch_timeout {
            self.poller.set_source(HttpArtworkSource::new(config.artwork.fetch_timeout));
        }
        self.poller.apply_config(&config);
        self.config = config;
        self.last_poll = None;
    }

    fn maybe_poll(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.config.player.poll_interval {
                return;
            }
        }
        self.last_poll = Some(now);

        let update = self.poller.tick();
        self.apply_update(ctx, update);
    }

    fn apply_update(&mut self, ctx: &egui::Context, update: PollUpdate) {
        self.track = update.track;
        self.player_available = update.player_available;

        match update.theme {
            ThemeResult::Unchanged => {}
            ThemeResult::Placeholder(theme) | ThemeResult::Resolved(theme) => {
                self.palette = theme.palette;
                self.background =
                    Surface::from_theme_image(ctx, "now_playing.background", &theme.background);
                self.artwork =
                    Surface::from_theme_image(ctx, "now_playing.artwork", &theme.artwork);
            }
        }
    }

    fn text_lines(&self) -> (String, String, String) {
        if !self.player_available {
            return (
                "Open a media player and play a song".to_string(),
                "No track playing".to_string(),
                String::new(),
            );
        }

        let mut info = vec![self.track.album.clone(), self.track.playback_status.to_string()];
        if let Some(length) = self.track.length {
            info.push(format_length(length));
        }
        (
            self.track.artist.clone(),
            self.track.title.clone(),
            info.join("  ·  "),
        )
    }

    fn render(&self, ctx: &egui::Context) {
        let screen = ctx.screen_rect();

        let painter = ctx.layer_painter(egui::LayerId::background());
        self.background.paint(&painter, screen);

        let content = screen.shrink(MARGIN);
        let art_side = (self.config.theme.art_size as f32)
            .min(content.height())
            .min(content.width() * 0.5)
            .max(0.0);
        let art_rect = Rect::from_min_max(
            Pos2::new(content.right() - art_side, content.bottom() - art_side),
            content.right_bottom(),
        );
        let text_rect = Rect::from_min_max(
            content.left_top(),
            Pos2::new(art_rect.left() - COLUMN_SPACING, content.bottom()),
        );

        let (artist, title, info) = self.text_lines();
        let palette = self.palette;

        let mut frame = egui::Frame::central_panel(&ctx.style());
        frame.fill = Color32::TRANSPARENT;
        frame.inner_margin = egui::Margin::same(0);

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.artwork.paint(ui.painter(), art_rect);

            ui.scope_builder(
                UiBuilder::new()
                    .max_rect(text_rect)
                    .layout(Layout::bottom_up(Align::Min)),
                |ui| {
                    ui.spacing_mut().item_spacing.y = LINE_SPACING;
                    if !info.is_empty() {
                        ui.label(
                            RichText::new(info)
                                .font(FontId::proportional(INFO_SIZE))
                                .color(color32(palette.medium)),
                        );
                    }
                    ui.label(
                        RichText::new(title)
                            .font(FontId::proportional(TITLE_SIZE))
                            .color(color32(palette.strong)),
                    );
                    ui.label(
                        RichText::new(artist)
                            .font(FontId::proportional(ARTIST_SIZE))
                            .color(color32(palette.base)),
                    );
                },
            );
        });
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(ViewportCommand::Close);
            return;
        }

        self.poll_config();
        self.maybe_poll(ctx);
        self.render(ctx);

        ctx.request_repaint_after(self.config.player.poll_interval.min(Duration::from_secs(1)));
    }
}

pub fn run(config: Config, watch_config: bool) -> anyhow::Result<()> {
    let watcher = if watch_config {
        match config.source.as_deref() {
            Some(path) => match ConfigWatcher::watch(path) {
                Ok(watcher) => {
                    info!("Watching {} for changes", watcher.path().display());
                    Some(watcher)
                }
                Err(err) => {
                    warn!("Config hot reload disabled: {err:#}");
                    None
                }
            },
            None => {
                warn!("No config file loaded; nothing to watch");
                None
            }
        }
    } else {
        None
    };

    let mut viewport = ViewportBuilder::default()
        .with_title("Now Playing")
        .with_inner_size([
            config.theme.display_width as f32,
            config.theme.display_height as f32,
        ])
        .with_decorations(!config.display.fullscreen)
        .with_fullscreen(config.display.fullscreen);
    if config.display.always_on_top {
        viewport = viewport.with_window_level(WindowLevel::AlwaysOnTop);
    }

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Now Playing",
        native_options,
        Box::new(
            move |_cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(OverlayApp::new(config, watcher))) },
        ),
    )
    .map_err(|err| anyhow!("Failed to start overlay window: {err}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use image::RgbImage;
    use now_playing_overlay::{PlaybackStatus, Theme, ThemeSettings};

    use super::*;

    fn app() -> OverlayApp {
        let config = Config {
            theme: ThemeSettings {
                display_width: 4,
                display_height: 4,
                art_size: 2,
                ..ThemeSettings::default()
            },
            ..Config::default()
        };
        OverlayApp::new(config, None)
    }

    fn resolved_update() -> PollUpdate {
        let bitmap = Arc::new(RgbImage::from_pixel(2, 2, image::Rgb([200, 40, 40])));
        PollUpdate {
            track: TrackMetadata {
                title: "Song A".to_string(),
                playback_status: PlaybackStatus::Playing,
                ..TrackMetadata::no_track()
            },
            player_available: true,
            theme: ThemeResult::Resolved(Theme {
                palette: Palette::from_accent(Rgb::new(200, 40, 40)),
                background: ThemeImage::Bitmap(bitmap.clone()),
                artwork: ThemeImage::Bitmap(bitmap),
            }),
        }
    }

    fn texture_id(surface: &Surface) -> Option<egui::TextureId> {
        match surface {
            Surface::Texture(texture) => Some(texture.id()),
            Surface::Solid(_) => None,
        }
    }

    #[test]
    fn no_player_shows_prompt() {
        let app = app();
        let (artist, title, info) = app.text_lines();
        assert_eq!(title, "No track playing");
        assert_eq!(artist, "Open a media player and play a song");
        assert!(info.is_empty());
    }

    #[test]
    fn info_line_joins_album_status_and_length() {
        let ctx = egui::Context::default();
        let mut app = app();
        let mut update = resolved_update();
        update.track.length = Some(Duration::from_secs(205));
        app.apply_update(&ctx, update);

        let (artist, title, info) = app.text_lines();
        assert_eq!(artist, "Unknown Artist");
        assert_eq!(title, "Song A");
        assert_eq!(info, "Unknown Album  ·  Playing  ·  3:25");
    }

    #[test]
    fn unchanged_theme_keeps_current_textures() {
        let ctx = egui::Context::default();
        let mut app = app();
        app.apply_update(&ctx, resolved_update());
        let background = texture_id(&app.background);
        let artwork = texture_id(&app.artwork);
        let palette = app.palette;
        assert!(background.is_some());

        let mut next = resolved_update();
        next.theme = ThemeResult::Unchanged;
        app.apply_update(&ctx, next);
        assert_eq!(texture_id(&app.background), background);
        assert_eq!(texture_id(&app.artwork), artwork);
        assert_eq!(app.palette, palette);
    }

    #[test]
    fn placeholder_replaces_textures_with_solid_fills() {
        let ctx = egui::Context::default();
        let mut app = app();
        app.apply_update(&ctx, resolved_update());

        let settings = app.config.theme.clone();
        app.apply_update(
            &ctx,
            PollUpdate {
                track: TrackMetadata::no_track(),
                player_available: false,
                theme: ThemeResult::Placeholder(Theme::placeholder(&settings)),
            },
        );
        assert!(matches!(app.background, Surface::Solid(color) if color == Color32::BLACK));
        assert_eq!(app.palette, Palette::DEFAULT);
    }

    #[test]
    fn reloaded_player_name_rebuilds_player() {
        let mut app = app();
        let mut config = app.config.clone();
        config.player.name = Some("spotify".to_string());
        config.artwork.fetch_timeout = Duration::from_secs(2);
        app.apply_config(config);

        assert_eq!(app.poller.player().player(), Some("spotify"));
        assert_eq!(app.config.artwork.fetch_timeout, Duration::from_secs(2));
        assert!(app.last_poll.is_none());
    }
}
