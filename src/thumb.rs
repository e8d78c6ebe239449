//! Procedural placeholder thumbnails for video posts that expose no
//! usable preview image. Output is a CSS-style gradient descriptor plus
//! a platform glyph; the same seed always produces the same output so
//! rows survive re-sorting unchanged.

/// Video platforms recognized in external link URLs, in icon precedence
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    Vimeo,
    Twitter,
    TikTok,
    Twitch,
}

impl Platform {
    pub fn glyph(self) -> &'static str {
        match self {
            Platform::YouTube => "▶️",
            Platform::Vimeo => "🎞️",
            Platform::Twitter => "🐦",
            Platform::TikTok => "📱",
            Platform::Twitch => "🎮",
        }
    }

    /// First platform whose marker appears in any of the URLs, checked
    /// in precedence order across the whole set.
    pub fn detect<'a, I>(urls: I) -> Option<Platform>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        const MARKERS: [(&[&str], Platform); 5] = [
            (&["youtube"], Platform::YouTube),
            (&["vimeo"], Platform::Vimeo),
            (&["twitter", "x.com"], Platform::Twitter),
            (&["tiktok"], Platform::TikTok),
            (&["twitch"], Platform::Twitch),
        ];
        for (markers, platform) in MARKERS {
            let mut candidates = urls.clone().into_iter();
            if candidates.any(|url| markers.iter().any(|marker| url.contains(marker))) {
                return Some(platform);
            }
        }
        None
    }
}

pub const DEFAULT_ICON: &str = "🎬";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticThumb {
    /// `linear-gradient(45deg, rgb(..), rgb(..))` descriptor.
    pub background: String,
    pub icon: &'static str,
}

/// Derives a placeholder thumbnail from the post's identity. Pure and
/// deterministic: identical seed and platform always yield an identical
/// thumbnail.
pub fn synthesize(seed: &str, platform: Option<Platform>) -> SyntheticThumb {
    SyntheticThumb {
        background: gradient(seed),
        icon: platform.map(Platform::glyph).unwrap_or(DEFAULT_ICON),
    }
}

/// 45-degree two-stop gradient; the second stop reuses the seed with an
/// `alt` suffix so the two colors stay correlated with the post.
pub fn gradient(seed: &str) -> String {
    let alt = format!("{seed}alt");
    format!("linear-gradient(45deg, {}, {})", color(seed), color(&alt))
}

fn color(seed: &str) -> String {
    let hash = seed_hash(seed);
    format!(
        "rgb({},{},{})",
        channel(hash, 0),
        channel(hash, 8),
        channel(hash, 16)
    )
}

// Channel range [100, 255]: the palette must stay bright enough for a
// dark glyph overlay.
fn channel(hash: u32, shift: u32) -> u32 {
    100 + ((hash >> shift) % 155)
}

/// 32-bit signed polynomial rolling hash (`h = h*31 + unit`) over UTF-16
/// code units, absolute value taken. This exact recurrence is load
/// bearing: thumbnails generated by older builds must not shift colors.
fn seed_hash(seed: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in seed.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}
