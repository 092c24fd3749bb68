use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::settings::ThemeConfig;

pub const DEFAULT_VARIANT: &str = "default";

/// Identifies the sprite of one (variant, cursor, size) triple.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteKey {
    pub variant: String,
    pub cursor: String,
    pub size: u32,
}

impl SpriteKey {
    pub fn new(variant: impl Into<String>, cursor: impl Into<String>, size: u32) -> Self {
        Self {
            variant: variant.into(),
            cursor: cursor.into(),
            size,
        }
    }
}

impl fmt::Display for SpriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.variant, self.cursor, self.size)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hotspot {
    pub x: u32,
    pub y: u32,
}

impl Hotspot {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, scale: u32) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
        }
    }

    /// Mirrors the hotspot horizontally inside a sprite `width` units wide.
    pub fn mirrored(self, width: u32) -> Self {
        Self {
            x: width.saturating_sub(self.x),
            y: self.y,
        }
    }
}

/// One discrete time sample of a sprite.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Vector snapshot with the hotspot marker already removed.
    pub svg: String,
    pub duration_ms: u32,
    pub hotspot: Hotspot,
}

#[derive(Clone, Debug)]
pub struct Sprite {
    pub size: u32,
    pub frames: Vec<Frame>,
    pub left_handed: Option<Vec<Frame>>,
}

impl Sprite {
    pub fn has_left_handed(&self) -> bool {
        self.left_handed.is_some()
    }

    /// Same sprite using its mirrored frames, if it has any.
    pub fn to_left_handed(&self) -> Option<Sprite> {
        self.left_handed.as_ref().map(|frames| Sprite {
            size: self.size,
            frames: frames.clone(),
            left_handed: None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Cursor {
    pub name: String,
    pub aliases: BTreeSet<String>,
    pub sprites: BTreeMap<u32, Sprite>,
}

impl Cursor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: BTreeSet::new(),
            sprites: BTreeMap::new(),
        }
    }

    pub fn sizes(&self) -> impl Iterator<Item = u32> + '_ {
        self.sprites.keys().copied()
    }
}

#[derive(Clone, Debug)]
pub struct Variant {
    pub name: String,
    pub cursors: BTreeMap<String, Cursor>,
    /// Variants consulted, in order, for cursors this one does not define
    /// before falling back to `default`.
    pub fallbacks: Vec<String>,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cursors: BTreeMap::new(),
            fallbacks: Vec::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_VARIANT
    }

    pub fn cursor_mut(&mut self, name: &str) -> &mut Cursor {
        self.cursors
            .entry(name.to_string())
            .or_insert_with(|| Cursor::new(name))
    }
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub name: String,
    pub comment: Option<String>,
    pub author: Option<String>,
    pub scales: Vec<u32>,
    pub variants: BTreeMap<String, Variant>,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut scales = config.scales.clone();
        scales.sort_unstable();
        scales.dedup();
        Self {
            name: config.name.clone(),
            comment: config.comment.clone().filter(|c| !c.is_empty()),
            author: config.author.clone().filter(|a| !a.is_empty()),
            scales,
            variants: BTreeMap::new(),
        }
    }

    pub fn variant_mut(&mut self, name: &str) -> &mut Variant {
        self.variants
            .entry(name.to_string())
            .or_insert_with(|| Variant::new(name))
    }

    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants.get(DEFAULT_VARIANT)
    }

    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    pub fn variant_slug(&self, variant: &str) -> String {
        if variant == DEFAULT_VARIANT {
            self.slug()
        } else {
            slugify(&format!("{} {}", self.name, variant))
        }
    }

    pub fn variant_display_name(&self, variant: &str) -> String {
        if variant == DEFAULT_VARIANT {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, variant)
        }
    }

    /// Finds the variant that actually holds `cursor` for `variant`: the
    /// variant itself, then its fallbacks in order, then `default`.
    pub fn resolve_cursor<'a>(&'a self, variant: &'a Variant, cursor: &str) -> Option<&'a Variant> {
        if variant.cursors.contains_key(cursor) {
            return Some(variant);
        }
        let fallback = variant
            .fallbacks
            .iter()
            .filter_map(|name| self.variants.get(name))
            .find(|v| v.cursors.contains_key(cursor));
        if fallback.is_some() {
            return fallback;
        }
        self.default_variant()
            .filter(|d| d.name != variant.name && d.cursors.contains_key(cursor))
    }
}

/// Lower-cases `name` and collapses every run of characters outside
/// `[a-z0-9]` into a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_gap = false;
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_runs() {
        assert_eq!(slugify("Phinger Cursors"), "phinger-cursors");
        assert_eq!(slugify("Phinger  Cursors -- Light!"), "phinger-cursors-light-");
        assert_eq!(slugify("ÄBC_12"), "-bc-12");
    }

    #[test]
    fn variant_slug_uses_theme_name() {
        let config = ThemeConfig {
            name: "Phinger Cursors".into(),
            ..ThemeConfig::default()
        };
        let theme = Theme::from_config(&config);
        assert_eq!(theme.variant_slug(DEFAULT_VARIANT), "phinger-cursors");
        assert_eq!(theme.variant_slug("Dark"), "phinger-cursors-dark");
        assert_eq!(theme.variant_display_name("Dark"), "Phinger Cursors - Dark");
        assert_eq!(theme.variant_display_name(DEFAULT_VARIANT), "Phinger Cursors");
    }

    #[test]
    fn hotspot_mirroring() {
        assert_eq!(Hotspot::new(3, 5).mirrored(24), Hotspot::new(21, 5));
        assert_eq!(Hotspot::new(30, 5).mirrored(24), Hotspot::new(0, 5));
        assert_eq!(Hotspot::new(3, 5).scaled(2), Hotspot::new(6, 10));
    }

    #[test]
    fn resolve_cursor_falls_back_to_default() {
        let mut theme = Theme::from_config(&ThemeConfig::default());
        theme.variant_mut(DEFAULT_VARIANT).cursor_mut("B");
        theme.variant_mut("hover").cursor_mut("A");

        let hover = &theme.variants["hover"];
        assert_eq!(theme.resolve_cursor(hover, "A").map(|v| v.name.as_str()), Some("hover"));
        assert_eq!(theme.resolve_cursor(hover, "B").map(|v| v.name.as_str()), Some(DEFAULT_VARIANT));
        assert!(theme.resolve_cursor(hover, "C").is_none());
    }
}
