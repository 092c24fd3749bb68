// Sprite catalog: decodes component records into typed sprite descriptors

use std::collections::BTreeMap;

use crate::animation::SpriteDescription;
use crate::error::{ThemeError, ThemeResult};
use crate::model::SpriteKey;

/// One component as yielded by a design source.
#[derive(Debug, Clone)]
pub struct ComponentRecord {
    pub id: String,
    /// Comma separated `key=value` properties, e.g. `cursor=wait, variant=default, size=24`.
    pub name: String,
    /// TOML animation description; empty for static sprites.
    pub description: String,
    pub svg: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteProperties {
    pub cursor: String,
    pub variant: String,
    pub size: u32,
    pub frame: u32,
    pub duration_ms: Option<u32>,
}

impl SpriteProperties {
    /// Strict decoder: every segment must be `key=value`, keys must be
    /// unique and known, and `cursor`, `variant` and `size` are required.
    pub fn parse(record: &str, name: &str) -> ThemeResult<Self> {
        let mut fields = BTreeMap::new();
        for segment in name.split(',') {
            let segment = segment.trim();
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ThemeError::MalformedProperties {
                    record: record.to_string(),
                    reason: format!("segment `{}` has no `=`", segment),
                }
            })?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() {
                return Err(ThemeError::MalformedProperties {
                    record: record.to_string(),
                    reason: format!("segment `{}` has an empty key", segment),
                });
            }
            if fields.insert(key, value).is_some() {
                return Err(ThemeError::MalformedProperties {
                    record: record.to_string(),
                    reason: format!("duplicate key `{}`", key),
                });
            }
        }

        if let Some(key) = fields
            .keys()
            .find(|k| !matches!(**k, "cursor" | "variant" | "size" | "frame" | "duration"))
        {
            return Err(ThemeError::UnknownProperty {
                record: record.to_string(),
                key: key.to_string(),
            });
        }

        let required = |key: &'static str| -> ThemeResult<String> {
            match fields.get(key) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(ThemeError::MissingProperty {
                    record: record.to_string(),
                    key,
                }),
            }
        };
        let number = |key: &str, value: &str| -> ThemeResult<u32> {
            value
                .parse::<u32>()
                .map_err(|_| ThemeError::InvalidPropertyValue {
                    record: record.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                })
        };

        let cursor = required("cursor")?;
        let variant = required("variant")?;
        let size = number("size", &required("size")?)?;
        if size == 0 {
            return Err(ThemeError::InvalidPropertyValue {
                record: record.to_string(),
                key: "size".into(),
                value: "0".into(),
            });
        }
        let frame = fields
            .get("frame")
            .map(|v| number("frame", v))
            .transpose()?
            .unwrap_or(0);
        let duration_ms = fields
            .get("duration")
            .map(|v| number("duration", v))
            .transpose()?
            .filter(|d| *d > 0);

        Ok(Self {
            cursor,
            variant,
            size,
            frame,
            duration_ms,
        })
    }

    pub fn key(&self) -> SpriteKey {
        SpriteKey::new(&self.variant, &self.cursor, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(usize);

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub component_id: String,
    pub properties: SpriteProperties,
    pub description: SpriteDescription,
    pub svg: String,
}

/// Read-only registry of decoded records, indexed by [`RecordId`].
#[derive(Debug, Default)]
pub struct SpriteCatalog {
    entries: Vec<CatalogEntry>,
}

impl SpriteCatalog {
    pub fn from_records(mut records: Vec<ComponentRecord>) -> ThemeResult<Self> {
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let properties = SpriteProperties::parse(&record.id, &record.name)?;
            let description = SpriteDescription::from_toml(&record.description).map_err(|e| {
                ThemeError::InvalidDescription {
                    record: record.id.clone(),
                    reason: e.to_string(),
                }
            })?;
            entries.push(CatalogEntry {
                component_id: record.id,
                properties,
                description,
                svg: record.svg,
            });
        }

        tracing::debug!("catalog holds {} sprite records", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: RecordId) -> &CatalogEntry {
        &self.entries[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        (0..self.entries.len()).map(RecordId)
    }

    /// Groups records by sprite, each group ordered by frame index.
    pub fn groups(&self) -> ThemeResult<BTreeMap<SpriteKey, Vec<RecordId>>> {
        let mut groups: BTreeMap<SpriteKey, Vec<RecordId>> = BTreeMap::new();
        for id in self.ids() {
            groups.entry(self.get(id).properties.key()).or_default().push(id);
        }

        for (key, ids) in groups.iter_mut() {
            ids.sort_by_key(|id| self.get(*id).properties.frame);
            for pair in ids.windows(2) {
                let frame = self.get(pair[0]).properties.frame;
                if frame == self.get(pair[1]).properties.frame {
                    return Err(ThemeError::DuplicateFrame {
                        sprite: key.to_string(),
                        frame,
                    });
                }
            }
        }
        Ok(groups)
    }
}
