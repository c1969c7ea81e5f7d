use std::sync::Arc;

use image::{imageops, imageops::FilterType, RgbImage};
use log::{debug, info, warn};

use crate::{
    artwork::{decode_artwork, ArtworkCache, ArtworkError, ArtworkSource},
    color::{accent_color, Palette, Rgb},
};

pub const DEFAULT_DISPLAY_WIDTH: u32 = 1920;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 1080;
pub const DEFAULT_ART_SIZE: u32 = 959;
pub const DEFAULT_BLUR_RADIUS: f32 = 50.0;
pub const DEFAULT_DIM_FACTOR: f32 = 0.3;

/// Knobs for the images a theme is rendered into.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSettings {
    pub display_width: u32,
    pub display_height: u32,
    pub art_size: u32,
    pub blur_radius: f32,
    pub dim_factor: f32,
    pub placeholder_background: Rgb,
    pub placeholder_artwork: Rgb,
    pub default_palette: Palette,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            art_size: DEFAULT_ART_SIZE,
            blur_radius: DEFAULT_BLUR_RADIUS,
            dim_factor: DEFAULT_DIM_FACTOR,
            placeholder_background: Rgb::BLACK,
            placeholder_artwork: Rgb::new(0x80, 0x80, 0x80),
            default_palette: Palette::DEFAULT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeImage {
    Solid { color: Rgb, width: u32, height: u32 },
    Bitmap(Arc<RgbImage>),
}

impl ThemeImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ThemeImage::Solid { width, height, .. } => (*width, *height),
            ThemeImage::Bitmap(image) => image.dimensions(),
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        match self {
            ThemeImage::Solid {
                color,
                width,
                height,
            } => RgbImage::from_pixel(*width, *height, (*color).into()),
            ThemeImage::Bitmap(image) => (**image).clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub palette: Palette,
    pub background: ThemeImage,
    pub artwork: ThemeImage,
}

impl Theme {
    pub fn placeholder(settings: &ThemeSettings) -> Self {
        Self {
            palette: settings.default_palette,
            background: ThemeImage::Solid {
                color: settings.placeholder_background,
                width: settings.display_width,
                height: settings.display_height,
            },
            artwork: ThemeImage::Solid {
                color: settings.placeholder_artwork,
                width: settings.art_size,
                height: settings.art_size,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeResult {
    /// Same reference as last time; keep what is on screen.
    Unchanged,
    Placeholder(Theme),
    Resolved(Theme),
}

impl ThemeResult {
    pub fn theme(&self) -> Option<&Theme> {
        match self {
            ThemeResult::Unchanged => None,
            ThemeResult::Placeholder(theme) | ThemeResult::Resolved(theme) => Some(theme),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ThemeResult::Unchanged)
    }
}

/// Everything `resolve` remembers between polls.
#[derive(Debug, Default)]
pub struct EngineState {
    current_reference: Option<String>,
    cache: ArtworkCache,
}

impl EngineState {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            current_reference: None,
            cache: ArtworkCache::new(cache_capacity),
        }
    }

    pub fn current_reference(&self) -> Option<&str> {
        self.current_reference.as_deref()
    }

    pub fn cache(&self) -> &ArtworkCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ArtworkCache {
        &mut self.cache
    }
}

pub struct ThemeEngine<S> {
    source: S,
    settings: ThemeSettings,
}

impl<S: ArtworkSource> ThemeEngine<S> {
    pub fn new(source: S, settings: ThemeSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &ThemeSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ThemeSettings) {
        self.settings = settings;
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Swaps the artwork source. Cached artwork stays valid.
    pub fn set_source(&mut self, source: S) {
        self.source = source;
    }

    /// Forgets what is on screen so the next resolve recomputes (from the
    /// cache when possible).
    pub fn invalidate(&self, state: &mut EngineState) {
        state.current_reference = None;
    }

    /// Turns an art reference into a theme. Never fails: anything that goes
    /// wrong yields the placeholder and leaves no current reference, so the
    /// next poll tries again.
    pub fn resolve(&self, reference: Option<&str>, state: &mut EngineState) -> ThemeResult {
        let Some(reference) = reference else {
            state.current_reference = None;
            return ThemeResult::Placeholder(Theme::placeholder(&self.settings));
        };

        if state.current_reference.as_deref() == Some(reference) {
            return ThemeResult::Unchanged;
        }

        let source = match self.load(reference, &mut state.cache) {
            Ok(image) => image,
            Err(err) => {
                warn!("Error loading album art {reference}: {err}");
                state.current_reference = None;
                return ThemeResult::Placeholder(Theme::placeholder(&self.settings));
            }
        };

        let accent = accent_color(&source);
        debug!("Accent color for {reference}: {accent}");
        let theme = Theme {
            palette: Palette::from_accent(accent),
            background: ThemeImage::Bitmap(Arc::new(render_background(&source, &self.settings))),
            artwork: ThemeImage::Bitmap(Arc::new(render_artwork(&source, &self.settings))),
        };

        state.current_reference = Some(reference.to_string());
        ThemeResult::Resolved(theme)
    }

    fn load(&self, reference: &str, cache: &mut ArtworkCache) -> Result<Arc<RgbImage>, ArtworkError> {
        if let Some(image) = cache.get(reference) {
            debug!("Artwork cache hit for {reference}");
            return Ok(image);
        }

        let bytes = self.source.fetch(reference)?;
        let image = Arc::new(decode_artwork(&bytes)?);
        info!(
            "Loaded album art {reference} ({}x{})",
            image.width(),
            image.height()
        );
        cache.insert(reference, Arc::clone(&image));
        Ok(image)
    }
}

/// Blurs the full-size source, dims it, then stretches it over the display.
pub fn render_background(source: &RgbImage, settings: &ThemeSettings) -> RgbImage {
    let mut backdrop = if settings.blur_radius > 0.0 {
        imageops::blur(source, settings.blur_radius)
    } else {
        source.clone()
    };
    dim(&mut backdrop, settings.dim_factor);
    imageops::resize(
        &backdrop,
        settings.display_width.max(1),
        settings.display_height.max(1),
        FilterType::Lanczos3,
    )
}

pub fn render_artwork(source: &RgbImage, settings: &ThemeSettings) -> RgbImage {
    let size = settings.art_size.max(1);
    imageops::resize(source, size, size, FilterType::Lanczos3)
}

/// Scales every channel by `factor` (0 = black, 1 = unchanged).
pub fn dim(image: &mut RgbImage, factor: f32) {
    let factor = factor.clamp(0.0, 1.0);
    for channel in image.iter_mut() {
        *channel = (*channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> ThemeSettings {
        ThemeSettings {
            display_width: 16,
            display_height: 9,
            art_size: 8,
            ..ThemeSettings::default()
        }
    }

    #[test]
    fn placeholder_uses_configured_colors_and_sizes() {
        let theme = Theme::placeholder(&small_settings());
        assert_eq!(theme.palette, Palette::DEFAULT);
        assert_eq!(theme.background.dimensions(), (16, 9));
        assert_eq!(theme.artwork.dimensions(), (8, 8));
        assert_eq!(
            theme.artwork.to_rgb_image().get_pixel(3, 3),
            &image::Rgb([0x80, 0x80, 0x80])
        );
        assert_eq!(
            theme.background.to_rgb_image().get_pixel(0, 0),
            &image::Rgb([0, 0, 0])
        );
    }

    #[test]
    fn dim_scales_channels() {
        let mut image = RgbImage::from_pixel(1, 1, image::Rgb([200, 100, 0]));
        dim(&mut image, 0.5);
        assert_eq!(image.get_pixel(0, 0), &image::Rgb([100, 50, 0]));
        dim(&mut image, 0.0);
        assert_eq!(image.get_pixel(0, 0), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn rendered_images_match_target_sizes() {
        let settings = small_settings();
        let source = RgbImage::from_pixel(12, 12, image::Rgb([10, 200, 30]));
        assert_eq!(render_background(&source, &settings).dimensions(), (16, 9));
        assert_eq!(render_artwork(&source, &settings).dimensions(), (8, 8));
    }

    #[test]
    fn unblurred_background_is_dimmed_source() {
        let settings = ThemeSettings {
            blur_radius: 0.0,
            dim_factor: 0.5,
            ..small_settings()
        };
        let source = RgbImage::from_pixel(16, 9, image::Rgb([200, 100, 50]));
        let background = render_background(&source, &settings);
        assert_eq!(background.get_pixel(8, 4), &image::Rgb([100, 50, 25]));
    }
}
