// Theme assembly: entity graph, variant fallbacks, aliases and slugs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{ThemeError, ThemeResult};
use crate::model::{Cursor, DEFAULT_VARIANT, Sprite, SpriteKey, Theme, ThemeConfig, Variant};

pub const LEFT_HANDED: &str = "left-handed";

/// Where a symlinked cursor name points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A cursor in this variant's own `cursors/` directory.
    Sibling { cursor: String },
    /// A cursor in another variant's theme directory.
    Variant { slug: String, cursor: String },
}

impl LinkTarget {
    /// Relative path as stored in the symlink.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            LinkTarget::Sibling { cursor } => PathBuf::from(cursor),
            LinkTarget::Variant { slug, cursor } => PathBuf::from("../..").join(slug).join("cursors").join(cursor),
        }
    }

    /// Slug and cursor name of the target, for a link inside `own_slug`.
    pub fn location<'a>(&'a self, own_slug: &'a str) -> (&'a str, &'a str) {
        match self {
            LinkTarget::Sibling { cursor } => (own_slug, cursor.as_str()),
            LinkTarget::Variant { slug, cursor } => (slug.as_str(), cursor.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorLink {
    pub name: String,
    pub target: LinkTarget,
}

/// Everything the writer needs for one variant directory.
#[derive(Debug, Clone)]
pub struct VariantPlan {
    pub name: String,
    pub slug: String,
    pub display_name: String,
    /// Cursors encoded from this variant's own sprites.
    pub cursors: Vec<String>,
    /// Fallback links first, then aliases.
    pub links: Vec<CursorLink>,
}

#[derive(Debug)]
pub struct AssembledTheme {
    pub theme: Theme,
    /// `default` first, then by name.
    pub variants: Vec<VariantPlan>,
    pub warnings: Vec<String>,
}

impl AssembledTheme {
    pub fn cursor(&self, variant: &str, cursor: &str) -> Option<&Cursor> {
        self.theme.variants.get(variant)?.cursors.get(cursor)
    }
}

/// One (declared size, scale) pair chosen to produce a pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterJob {
    pub declared: u32,
    pub scale: u32,
    pub pixel_size: u32,
}

/// Picks the image sizes to emit for `cursor`. When several declared sizes
/// land on the same pixel size, the one needing the smallest scale wins.
pub fn raster_plan(cursor: &Cursor, scales: &[u32], max_pixel_size: u32) -> Vec<RasterJob> {
    let mut chosen: BTreeMap<u32, RasterJob> = BTreeMap::new();
    for declared in cursor.sizes() {
        for &scale in scales {
            let pixel_size = declared * scale;
            if pixel_size > max_pixel_size {
                continue;
            }
            let job = RasterJob {
                declared,
                scale,
                pixel_size,
            };
            chosen
                .entry(pixel_size)
                .and_modify(|existing| {
                    if scale < existing.scale {
                        *existing = job;
                    }
                })
                .or_insert(job);
        }
    }
    chosen.into_values().collect()
}

pub struct ThemeAssembler<'a> {
    config: &'a ThemeConfig,
}

impl<'a> ThemeAssembler<'a> {
    pub fn new(config: &'a ThemeConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, sprites: Vec<(SpriteKey, Sprite)>) -> ThemeResult<AssembledTheme> {
        let mut theme = Theme::from_config(self.config);
        let mut warnings = Vec::new();

        for (key, sprite) in sprites {
            theme
                .variant_mut(&key.variant)
                .cursor_mut(&key.cursor)
                .sprites
                .insert(key.size, sprite);
        }
        if theme.default_variant().is_none() {
            return Err(ThemeError::MissingDefaultVariant);
        }

        if self.config.left_handed {
            self.derive_left_handed(&mut theme, &mut warnings);
        }

        let slugs = check_slugs(&theme)?;

        let mut order: Vec<&str> = theme.variants.keys().map(String::as_str).collect();
        order.sort_by_key(|name| (*name != DEFAULT_VARIANT, *name));

        let mut plans = Vec::with_capacity(order.len());
        let mut aliases: Vec<(String, String, String)> = Vec::new();
        for name in order {
            let variant = &theme.variants[name];
            let mut plan = VariantPlan {
                name: name.to_string(),
                slug: slugs[name].clone(),
                display_name: theme.variant_display_name(name),
                cursors: variant.cursors.keys().cloned().collect(),
                links: Vec::new(),
            };

            let mut inherited = BTreeSet::new();
            for fallback in variant.fallbacks.iter().filter_map(|f| theme.variants.get(f)) {
                inherited.extend(fallback.cursors.keys().cloned());
            }
            if let Some(default) = theme.default_variant() {
                inherited.extend(default.cursors.keys().cloned());
            }
            for cursor in inherited {
                if variant.cursors.contains_key(&cursor) {
                    continue;
                }
                if let Some(source) = theme.resolve_cursor(variant, &cursor) {
                    plan.links.push(CursorLink {
                        name: cursor.clone(),
                        target: LinkTarget::Variant {
                            slug: slugs[source.name.as_str()].clone(),
                            cursor,
                        },
                    });
                }
            }

            let mut taken: BTreeSet<String> = plan.cursors.iter().cloned().collect();
            taken.extend(plan.links.iter().map(|l| l.name.clone()));
            for rule in &self.config.aliases {
                if taken.contains(&rule.alias) {
                    let message = format!(
                        "{}: alias `{}` -> `{}` skipped, `{}` is already taken",
                        name, rule.alias, rule.cursor, rule.alias
                    );
                    warn!("{}", message);
                    warnings.push(message);
                    continue;
                }
                if theme.resolve_cursor(variant, &rule.cursor).is_none() {
                    let message = format!(
                        "{}: alias `{}` skipped, target cursor `{}` does not exist",
                        name, rule.alias, rule.cursor
                    );
                    warn!("{}", message);
                    warnings.push(message);
                    continue;
                }
                taken.insert(rule.alias.clone());
                plan.links.push(CursorLink {
                    name: rule.alias.clone(),
                    target: LinkTarget::Sibling {
                        cursor: rule.cursor.clone(),
                    },
                });
                if variant.cursors.contains_key(&rule.cursor) {
                    aliases.push((name.to_string(), rule.cursor.clone(), rule.alias.clone()));
                }
            }

            debug!(
                "variant {} -> {}: {} cursors, {} links",
                plan.name,
                plan.slug,
                plan.cursors.len(),
                plan.links.len()
            );
            plans.push(plan);
        }

        for (variant, cursor, alias) in aliases {
            theme.variant_mut(&variant).cursor_mut(&cursor).aliases.insert(alias);
        }

        Ok(AssembledTheme {
            theme,
            variants: plans,
            warnings,
        })
    }

    fn derive_left_handed(&self, theme: &mut Theme, warnings: &mut Vec<String>) {
        let mut derived = Vec::new();
        for variant in theme.variants.values() {
            let cursors: BTreeMap<String, Cursor> = variant
                .cursors
                .values()
                .filter(|c| c.sprites.values().any(Sprite::has_left_handed))
                .map(|c| {
                    let mut mirrored = Cursor::new(&c.name);
                    for (size, sprite) in &c.sprites {
                        let sprite = sprite.to_left_handed().unwrap_or_else(|| sprite.clone());
                        mirrored.sprites.insert(*size, sprite);
                    }
                    (c.name.clone(), mirrored)
                })
                .collect();
            if cursors.is_empty() {
                continue;
            }

            let name = if variant.is_default() {
                LEFT_HANDED.to_string()
            } else {
                format!("{} {}", variant.name, LEFT_HANDED)
            };
            if theme.variants.contains_key(&name) {
                let message = format!(
                    "left-handed variant `{}` not derived, a variant with that name already exists",
                    name
                );
                warn!("{}", message);
                warnings.push(message);
                continue;
            }
            derived.push(Variant {
                name,
                cursors,
                fallbacks: vec![variant.name.clone()],
            });
        }

        // A cursor a variant inherits from `default` should stay mirrored in
        // that variant's left-handed set.
        if derived.iter().any(|v| v.name == LEFT_HANDED) {
            for variant in derived.iter_mut().filter(|v| v.name != LEFT_HANDED) {
                variant.fallbacks.push(LEFT_HANDED.to_string());
            }
        }

        for variant in derived {
            debug!("derived left-handed variant {}", variant.name);
            theme.variants.insert(variant.name.clone(), variant);
        }
    }
}

fn check_slugs(theme: &Theme) -> ThemeResult<BTreeMap<&str, String>> {
    let mut owners: BTreeMap<String, &str> = BTreeMap::new();
    let mut slugs = BTreeMap::new();
    for name in theme.variants.keys() {
        let slug = theme.variant_slug(name);
        if let Some(first) = owners.get(&slug) {
            return Err(ThemeError::SlugCollision {
                first: first.to_string(),
                second: name.clone(),
                slug,
            });
        }
        owners.insert(slug.clone(), name.as_str());
        slugs.insert(name.as_str(), slug);
    }
    Ok(slugs)
}
