// Materializes assembled variants as cursor theme directories:
// <output>/<slug>/index.theme and <output>/<slug>/cursors/*

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::assembler::VariantPlan;
use super::fs_ops::{ensure_dir, remove_if_present, replace_symlink, write_atomic};

pub struct ThemeWriter {
    output_dir: PathBuf,
}

impl ThemeWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn variant_dir(&self, plan: &VariantPlan) -> PathBuf {
        self.output_dir.join(&plan.slug)
    }

    pub fn cursors_dir(&self, plan: &VariantPlan) -> PathBuf {
        self.variant_dir(plan).join("cursors")
    }

    pub fn prepare(&self, plan: &VariantPlan) -> Result<()> {
        let dir = self.cursors_dir(plan);
        ensure_dir(&dir).with_context(|| format!("Failed to create {}", dir.display()))
    }

    pub fn write_cursor(&self, plan: &VariantPlan, cursor: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.cursors_dir(plan).join(cursor);
        write_atomic(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("wrote {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// Removes the file or link left at `cursor` by an earlier run.
    pub fn remove_cursor(&self, plan: &VariantPlan, cursor: &str) -> Result<()> {
        let path = self.cursors_dir(plan).join(cursor);
        if remove_if_present(&path).with_context(|| format!("Failed to remove {}", path.display()))? {
            debug!("removed stale {}", path.display());
        }
        Ok(())
    }

    /// Creates every link of `plan` whose target is in `available`, keyed by
    /// variant slug and cursor name. Created links are added to `available`
    /// so later aliases can point at them. A skipped link is also removed
    /// from disk. Returns the number created and a warning per skipped link.
    pub fn write_links(
        &self,
        plan: &VariantPlan,
        available: &mut BTreeSet<(String, String)>,
    ) -> Result<(usize, Vec<String>)> {
        let cursors_dir = self.cursors_dir(plan);
        let mut created = 0;
        let mut warnings = Vec::new();

        for link in &plan.links {
            let target = link.target.relative_path();
            let link_path = cursors_dir.join(&link.name);
            let (slug, cursor) = link.target.location(&plan.slug);
            if !available.contains(&(slug.to_string(), cursor.to_string())) {
                remove_if_present(&link_path).with_context(|| format!("Failed to remove {}", link_path.display()))?;
                let message = format!(
                    "{}: link `{}` -> {} skipped, target was not written",
                    plan.name,
                    link.name,
                    target.display()
                );
                warn!("{}", message);
                warnings.push(message);
                continue;
            }
            replace_symlink(&target, &link_path)
                .with_context(|| format!("Failed to link {} -> {}", link_path.display(), target.display()))?;
            available.insert((plan.slug.clone(), link.name.clone()));
            created += 1;
        }

        Ok((created, warnings))
    }

    pub fn write_index(&self, plan: &VariantPlan, comment: Option<&str>) -> Result<()> {
        let path = self.variant_dir(plan).join("index.theme");
        fs::write(&path, index_theme(&plan.display_name, comment))
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

pub fn index_theme(name: &str, comment: Option<&str>) -> String {
    let mut content = format!("[Icon Theme]\nName={}\n", name);
    if let Some(comment) = comment {
        content.push_str(&format!("Comment={}\n", comment));
    }
    content
}

/// `~/.icons`, where user cursor themes are picked up.
pub fn user_icons_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home_dir.join(".icons"))
}
