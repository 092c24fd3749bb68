// Local catalog: a directory tree of SVG components. The file stem is the
// property string (`cursor=wait, variant=default, size=24.svg`); an optional
// sibling `.toml` with the same stem holds the animation description.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::DesignSource;
use crate::catalog::ComponentRecord;

pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn record(&self, path: &Path) -> Result<ComponentRecord> {
        let id = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let svg = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

        let description_path = path.with_extension("toml");
        let description = if description_path.is_file() {
            fs::read_to_string(&description_path)
                .with_context(|| format!("Failed to read {}", description_path.display()))?
        } else {
            String::new()
        };

        Ok(ComponentRecord {
            id,
            name,
            description,
            svg,
        })
    }
}

impl DesignSource for LocalSource {
    fn components(&self) -> Result<Vec<ComponentRecord>> {
        if !self.root.is_dir() {
            anyhow::bail!("{} is not a directory", self.root.display());
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_svg = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("svg"));
            if !entry.file_type().is_file() || !is_svg {
                continue;
            }
            records.push(self.record(path)?);
        }

        debug!("found {} components under {}", records.len(), self.root.display());
        Ok(records)
    }
}
