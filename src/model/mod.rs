pub mod settings;
pub mod theme;

pub use settings::{AliasRule, ThemeConfig};
pub use theme::{Cursor, DEFAULT_VARIANT, Frame, Hotspot, Sprite, SpriteKey, Theme, Variant, slugify};
