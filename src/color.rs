use std::fmt;

use image::{imageops, imageops::FilterType, RgbImage};

/// Edge of the square grid the artwork is sampled on before averaging.
pub const SAMPLE_GRID: u32 = 50;
/// Pixels whose channel sum is at or below this are treated as background.
pub const BRIGHT_PIXEL_THRESHOLD: u32 = 100;
/// Averages darker than this are replaced with white.
pub const ACCENT_FLOOR: f32 = 80.0;

pub const STRONG_MULTIPLIER: f64 = 1.5;
pub const MEDIUM_MULTIPLIER: f64 = 1.2;

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRD: f64 = 2.0 / 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let bytes = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::new(
            ((bytes >> 16) & 0xFF) as u8,
            ((bytes >> 8) & 0xFF) as u8,
            (bytes & 0xFF) as u8,
        ))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn channel_sum(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    pub fn to_hls(self) -> Hls {
        Hls::from_rgb(self)
    }

    /// Scales lightness by `factor` keeping hue and saturation.
    pub fn with_lightness_scaled(self, factor: f64) -> Rgb {
        let hls = self.to_hls();
        Hls {
            l: (hls.l * factor).clamp(0.0, 1.0),
            ..hls
        }
        .to_rgb()
    }
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(value: image::Rgb<u8>) -> Self {
        let [r, g, b] = value.0;
        Self::new(r, g, b)
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(value: Rgb) -> Self {
        image::Rgb([value.r, value.g, value.b])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Hue, lightness, saturation, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hls {
    pub h: f64,
    pub l: f64,
    pub s: f64,
}

impl Hls {
    pub fn from_rgb(color: Rgb) -> Self {
        let r = color.r as f64 / 255.0;
        let g = color.g as f64 / 255.0;
        let b = color.b as f64 / 255.0;

        let maxc = r.max(g).max(b);
        let minc = r.min(g).min(b);
        let sumc = maxc + minc;
        let rangec = maxc - minc;
        let l = sumc / 2.0;
        if minc == maxc {
            return Self { h: 0.0, l, s: 0.0 };
        }

        let s = if l <= 0.5 {
            rangec / sumc
        } else {
            rangec / (2.0 - sumc)
        };

        let rc = (maxc - r) / rangec;
        let gc = (maxc - g) / rangec;
        let bc = (maxc - b) / rangec;
        let h = if r == maxc {
            bc - gc
        } else if g == maxc {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };

        Self {
            h: (h / 6.0).rem_euclid(1.0),
            l,
            s,
        }
    }

    /// Channels are truncated, not rounded.
    pub fn to_rgb(self) -> Rgb {
        let (r, g, b) = if self.s == 0.0 {
            (self.l, self.l, self.l)
        } else {
            let m2 = if self.l <= 0.5 {
                self.l * (1.0 + self.s)
            } else {
                self.l + self.s - (self.l * self.s)
            };
            let m1 = 2.0 * self.l - m2;
            (
                hue_channel(m1, m2, self.h + ONE_THIRD),
                hue_channel(m1, m2, self.h),
                hue_channel(m1, m2, self.h - ONE_THIRD),
            )
        };
        Rgb::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        return m1 + (m2 - m1) * hue * 6.0;
    }
    if hue < 0.5 {
        return m2;
    }
    if hue < TWO_THIRD {
        return m1 + (m2 - m1) * (TWO_THIRD - hue) * 6.0;
    }
    m1
}

fn unit_to_byte(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0) as u8
}

/// The three text color roles of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Title.
    pub strong: Rgb,
    /// Album line and playback status.
    pub medium: Rgb,
    /// Artist line.
    pub base: Rgb,
}

impl Palette {
    pub const DEFAULT: Palette = Palette {
        strong: Rgb::new(0xff, 0xff, 0xff),
        medium: Rgb::new(0x88, 0x88, 0x88),
        base: Rgb::new(0x55, 0x55, 0x55),
    };

    pub fn from_accent(accent: Rgb) -> Self {
        Self {
            strong: accent.with_lightness_scaled(STRONG_MULTIPLIER),
            medium: accent.with_lightness_scaled(MEDIUM_MULTIPLIER),
            base: accent,
        }
    }

    pub fn roles(&self) -> [Rgb; 3] {
        [self.strong, self.medium, self.base]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Averages the bright pixels of a 50x50 downsample of `image`.
///
/// When no pixel clears [`BRIGHT_PIXEL_THRESHOLD`] the whole sample is
/// averaged instead. A result darker than [`ACCENT_FLOOR`] comes back as
/// white.
pub fn accent_color(image: &RgbImage) -> Rgb {
    if image.width() == 0 || image.height() == 0 {
        return Rgb::WHITE;
    }

    let sample = imageops::resize(image, SAMPLE_GRID, SAMPLE_GRID, FilterType::Lanczos3);
    let pixels: Vec<Rgb> = sample.pixels().map(|p| Rgb::from(*p)).collect();

    let bright: Vec<Rgb> = pixels
        .iter()
        .copied()
        .filter(|p| p.channel_sum() > BRIGHT_PIXEL_THRESHOLD)
        .collect();
    let population = if bright.is_empty() { &pixels } else { &bright };

    let count = population.len() as u64;
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for pixel in population {
        r += pixel.r as u64;
        g += pixel.g as u64;
        b += pixel.b as u64;
    }
    let average = Rgb::new((r / count) as u8, (g / count) as u8, (b / count) as u8);

    if (average.channel_sum() as f32 / 3.0) < ACCENT_FLOOR {
        return Rgb::WHITE;
    }
    average
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: Rgb) -> RgbImage {
        RgbImage::from_pixel(width, height, color.into())
    }

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(Rgb::from_hex("#ffffff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("888888"), Some(Rgb::new(0x88, 0x88, 0x88)));
        assert_eq!(Rgb::from_hex("#fff"), None);
        assert_eq!(Rgb::from_hex("#gg0000"), None);
        assert_eq!(Rgb::new(0x55, 0x55, 0x55).to_hex(), "#555555");
    }

    #[test]
    fn pure_red_round_trips_through_hls() {
        let hls = Rgb::new(255, 0, 0).to_hls();
        assert_eq!(hls.h, 0.0);
        assert_eq!(hls.l, 0.5);
        assert_eq!(hls.s, 1.0);
        assert_eq!(hls.to_rgb(), Rgb::new(255, 0, 0));
    }

    #[test]
    fn grays_have_no_saturation() {
        let hls = Rgb::new(0x88, 0x88, 0x88).to_hls();
        assert_eq!(hls.s, 0.0);
        assert_eq!(hls.to_rgb(), Rgb::new(0x88, 0x88, 0x88));
    }

    #[test]
    fn lightness_is_clamped_before_conversion() {
        assert_eq!(Rgb::new(230, 230, 230).with_lightness_scaled(1.5), Rgb::WHITE);
    }

    #[test]
    fn dark_images_fall_back_to_white() {
        let image = solid(64, 64, Rgb::new(20, 20, 20));
        assert_eq!(accent_color(&image), Rgb::WHITE);
    }

    #[test]
    fn bright_subject_wins_over_dark_border() {
        let subject = Rgb::new(40, 220, 60);
        let mut image = solid(100, 100, Rgb::BLACK);
        for y in 20..80 {
            for x in 20..80 {
                image.put_pixel(x, y, subject.into());
            }
        }
        let accent = accent_color(&image);
        // A plain average over the whole frame would put green near 80.
        assert_ne!(accent, Rgb::WHITE);
        assert!((180..=230).contains(&accent.g), "{accent}");
        assert!((25..=50).contains(&accent.r), "{accent}");
        assert!((40..=70).contains(&accent.b), "{accent}");
    }

    #[test]
    fn saturated_dim_subject_falls_back_to_white() {
        let mut image = solid(100, 100, Rgb::BLACK);
        for y in 20..80 {
            for x in 20..80 {
                image.put_pixel(x, y, Rgb::new(0, 200, 0).into());
            }
        }
        assert_eq!(accent_color(&image), Rgb::WHITE);
    }

    #[test]
    fn uniform_bright_image_keeps_its_color() {
        let image = solid(80, 80, Rgb::new(255, 0, 0));
        assert_eq!(accent_color(&image), Rgb::new(255, 0, 0));
    }

    #[test]
    fn palette_roles_share_hue_and_order_lightness() {
        for accent in [
            Rgb::new(200, 40, 40),
            Rgb::new(30, 90, 160),
            Rgb::new(120, 200, 90),
            Rgb::new(150, 120, 40),
        ] {
            let palette = Palette::from_accent(accent);
            let [strong, medium, base] = palette.roles().map(Rgb::to_hls);
            for other in [medium, base] {
                assert!((strong.h - other.h).abs() < 0.02, "{accent}");
            }
            assert!((medium.s - base.s).abs() < 0.02, "{accent}");
            if accent.to_hls().l * STRONG_MULTIPLIER < 1.0 {
                assert!((strong.s - base.s).abs() < 0.04, "{accent}");
            }
            assert!(strong.l >= medium.l && medium.l >= base.l, "{accent}");
        }
    }

    #[test]
    fn base_role_is_the_raw_accent() {
        let accent = Rgb::new(255, 255, 235);
        assert_eq!(Palette::from_accent(accent).base, accent);
    }

    #[test]
    fn red_palette_uses_documented_multipliers() {
        let palette = Palette::from_accent(Rgb::new(255, 0, 0));
        assert_eq!(palette.base, Rgb::new(255, 0, 0));
        assert_eq!(palette.strong, Rgb::new(255, 127, 127));
        assert_eq!(palette.medium.r, 255);
        assert!(palette.medium.g.abs_diff(51) <= 1);
        assert_eq!(palette.medium.g, palette.medium.b);
    }

    #[test]
    fn display_formats_as_css_rgb() {
        assert_eq!(Rgb::new(1, 2, 3).to_string(), "rgb(1, 2, 3)");
    }
}
