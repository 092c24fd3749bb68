use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ThemeError, ThemeResult};

/// An extra name under which an existing cursor is installed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub alias: String,
    pub cursor: String,
}

impl AliasRule {
    pub fn new(alias: impl Into<String>, cursor: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            cursor: cursor.into(),
        }
    }
}

/// Theme-wide settings, stored as `theme.toml`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default = "default_scales")]
    pub scales: Vec<u32>,

    /// Delay written for frames without an authored duration, static cursors included.
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_max_pixel_size")]
    pub max_pixel_size: u32,

    #[serde(default = "default_hotspot_id")]
    pub hotspot_id: String,

    #[serde(default = "default_left_handed")]
    pub left_handed: bool,

    #[serde(default = "default_aliases")]
    pub aliases: Vec<AliasRule>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "Cursors".to_string(),
            comment: None,
            author: None,
            scales: default_scales(),
            default_delay_ms: default_delay_ms(),
            fps: default_fps(),
            max_pixel_size: default_max_pixel_size(),
            hotspot_id: default_hotspot_id(),
            left_handed: default_left_handed(),
            aliases: default_aliases(),
        }
    }
}

impl ThemeConfig {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let content = self.to_toml_string().map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ThemeResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ThemeError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| ThemeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ThemeResult<()> {
        if self.name.trim().is_empty() {
            return Err(ThemeError::Config("theme name cannot be empty".into()));
        }
        if self.scales.is_empty() || self.scales.contains(&0) {
            return Err(ThemeError::Config(format!(
                "scales must be non-empty positive integers, got {:?}",
                self.scales
            )));
        }
        if self.fps == 0 || self.fps > 1000 {
            return Err(ThemeError::Config(format!(
                "fps must be between 1 and 1000, got {}",
                self.fps
            )));
        }
        if self.default_delay_ms == 0 {
            return Err(ThemeError::Config("default_delay_ms must be non-zero".into()));
        }
        if self.hotspot_id.is_empty() {
            return Err(ThemeError::Config("hotspot_id cannot be empty".into()));
        }
        Ok(())
    }
}

fn default_scales() -> Vec<u32> {
    vec![1, 2, 4]
}

fn default_delay_ms() -> u32 {
    50
}

fn default_fps() -> u32 {
    30
}

fn default_max_pixel_size() -> u32 {
    512
}

fn default_hotspot_id() -> String {
    "hotspot".to_string()
}

fn default_left_handed() -> bool {
    true
}

// Conventional X11 names, keyed by the cursor that provides them.
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("left_ptr", &["arrow", "default", "top_left_arrow", "wayland-cursor"]),
    (
        "pointer",
        &[
            "hand1",
            "hand2",
            "pointing_hand",
            "9d800788f1b08800ae810202380a0822",
            "e29285e634086352946a0e7090d73106",
        ],
    ),
    ("grab", &["openhand"]),
    (
        "grabbing",
        &["closedhand", "dnd-move", "fcf21c00b30f7e3f83fe0dfd12e71cff"],
    ),
    (
        "move",
        &[
            "fleur",
            "all-scroll",
            "size_all",
            "4498f0e0c1937ffe01fd06f973665830",
            "9081237383d90e509aa00f00170e968f",
        ],
    ),
    ("wait", &["watch"]),
    (
        "progress",
        &[
            "left_ptr_watch",
            "00000000000000020006000e7e9ffc3f",
            "08e8e1c95fe2fc01f976f1e063a24ccd",
            "3ecb610c1bf2410f44200f48c40d3599",
        ],
    ),
    ("crosshair", &["cross", "cross_reverse", "diamond_cross", "tcross"]),
    ("text", &["xterm", "ibeam"]),
    ("pencil", &["draft"]),
    (
        "help",
        &[
            "question_arrow",
            "whats_this",
            "left_ptr_help",
            "5c6cd98b3f3ebcb1f9c7f1c204630408",
            "d9ce0ab605698f320427677b458ad60b",
        ],
    ),
    (
        "not-allowed",
        &[
            "crossed_circle",
            "forbidden",
            "no_drop",
            "no-drop",
            "dnd_no_drop",
            "03b6e0fcb3499374a867c041f52298f0",
        ],
    ),
    (
        "ew-resize",
        &[
            "sb_h_double_arrow",
            "h_double_arrow",
            "size_hor",
            "col-resize",
            "split_h",
            "028006030e0e7ebffc7f7070c0600140",
            "14fef782d02440884392942c11205230",
        ],
    ),
    (
        "ns-resize",
        &[
            "sb_v_double_arrow",
            "v_double_arrow",
            "size_ver",
            "row-resize",
            "split_v",
            "double_arrow",
            "00008160000006810000408080010102",
            "2870a09082c103050810ffdffffe0204",
        ],
    ),
    (
        "nesw-resize",
        &["fd_double_arrow", "size_bdiag", "fcf1c3c7cd4491d801f1e1c78f100000"],
    ),
    (
        "nwse-resize",
        &["bd_double_arrow", "size_fdiag", "c7088f0f3e6c8088236ef8e1e3e70000"],
    ),
    (
        "alias",
        &[
            "link",
            "dnd-link",
            "3085a0e285430894940527032f8b26df",
            "640fb0e74195791501fd1ed57b41487f",
            "a2a266d0498c3104214a47bd64ab0fc8",
        ],
    ),
    (
        "copy",
        &[
            "dnd-copy",
            "1081e37283d90000800003c07f3ef6bf",
            "6407b0e94181790501fd1e167b474872",
            "b66166c04f8c3109214a4fbd64a50fc8",
        ],
    ),
    ("cell", &["plus"]),
    ("dotbox", &["dot_box_mask", "draped_box", "icon", "target"]),
    ("right_ptr", &["draft_large", "draft_small"]),
    ("e-resize", &["right_side"]),
    ("n-resize", &["top_side"]),
    ("s-resize", &["bottom_side"]),
    ("w-resize", &["left_side"]),
    ("ne-resize", &["top_right_corner"]),
    ("nw-resize", &["top_left_corner"]),
    ("se-resize", &["bottom_right_corner"]),
    ("sw-resize", &["bottom_left_corner"]),
    ("X_cursor", &["pirate", "x-cursor"]),
];

pub fn default_aliases() -> Vec<AliasRule> {
    DEFAULT_ALIASES
        .iter()
        .flat_map(|(cursor, aliases)| aliases.iter().map(|alias| AliasRule::new(*alias, *cursor)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = ThemeConfig::from_toml_str("name = \"Phinger\"\n").unwrap();
        assert_eq!(config.name, "Phinger");
        assert_eq!(config.scales, vec![1, 2, 4]);
        assert_eq!(config.default_delay_ms, 50);
        assert_eq!(config.fps, 30);
        assert_eq!(config.hotspot_id, "hotspot");
        assert!(config.aliases.contains(&AliasRule::new("watch", "wait")));
        config.validate().unwrap();
    }

    #[test]
    fn explicit_aliases_replace_defaults() {
        let config = ThemeConfig::from_toml_str(
            r#"
            name = "Phinger"
            comment = "Over engineered"
            default_delay_ms = 80

            [[aliases]]
            alias = "wait"
            cursor = "progress"
            "#,
        )
        .unwrap();
        assert_eq!(config.aliases, vec![AliasRule::new("wait", "progress")]);
        assert_eq!(config.comment.as_deref(), Some("Over engineered"));
        assert_eq!(config.default_delay_ms, 80);
    }

    #[test]
    fn toml_round_trip_preserves_aliases() {
        let config = ThemeConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = ThemeConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.aliases, config.aliases);
        assert_eq!(parsed.scales, config.scales);
    }

    #[test]
    fn validate_rejects_zero_scale() {
        let config = ThemeConfig {
            scales: vec![1, 0],
            ..ThemeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ThemeError::Config(_))));
    }

    #[test]
    fn default_alias_names_are_unique() {
        let aliases = default_aliases();
        let mut names: Vec<&str> = aliases.iter().map(|a| a.alias.as_str()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
