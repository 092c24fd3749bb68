// Build runner: catalog -> sampled sprites -> assembled theme -> files on disk

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::assembler::{ThemeAssembler, VariantPlan, raster_plan};
use super::raster::{FrameRasterAdapter, RasterImage, Rasterizer};
use super::theme_writer::ThemeWriter;
use super::xcursor_writer::to_x11;
use crate::animation::AnimationEngine;
use crate::catalog::{RecordId, SpriteCatalog};
use crate::error::{ThemeError, ThemeResult};
use crate::model::{Cursor, Sprite, SpriteKey, ThemeConfig};

/// A cursor that could not be rendered, encoded or written.
#[derive(Debug)]
pub struct CursorFailure {
    pub variant: String,
    pub cursor: String,
    pub error: ThemeError,
}

impl fmt::Display for CursorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {:#}", self.variant, self.cursor, self.error)
    }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Theme directories, `default` first.
    pub variants: Vec<PathBuf>,
    pub written: Vec<PathBuf>,
    pub links: usize,
    pub failures: Vec<CursorFailure>,
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ThemeBuilder<'a> {
    config: &'a ThemeConfig,
    rasterizer: &'a dyn Rasterizer,
    thread_count: usize,
}

impl<'a> ThemeBuilder<'a> {
    pub fn new(config: &'a ThemeConfig, rasterizer: &'a dyn Rasterizer) -> Self {
        Self {
            config,
            rasterizer,
            thread_count: 0,
        }
    }

    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Samples every sprite of the catalog. Any input error aborts.
    pub fn build_sprites(&self, catalog: &SpriteCatalog) -> ThemeResult<Vec<(SpriteKey, Sprite)>> {
        let engine = AnimationEngine::new(self.config.fps, self.config.hotspot_id.clone());
        let groups: Vec<(SpriteKey, Vec<RecordId>)> = catalog.groups()?.into_iter().collect();

        groups
            .into_par_iter()
            .map(|(key, ids)| -> ThemeResult<(SpriteKey, Sprite)> {
                let sprite = self.build_sprite(&engine, catalog, &key, &ids)?;
                Ok((key, sprite))
            })
            .collect()
    }

    fn build_sprite(
        &self,
        engine: &AnimationEngine,
        catalog: &SpriteCatalog,
        key: &SpriteKey,
        ids: &[RecordId],
    ) -> ThemeResult<Sprite> {
        let mut frames = Vec::new();
        let mut mirrored = Vec::new();
        let mut has_mirrored = false;

        for id in ids {
            let entry = catalog.get(*id);
            let mut sampled = engine.sample(key, &entry.svg, &entry.description)?;

            let static_delay = entry.properties.duration_ms.unwrap_or(self.config.default_delay_ms);
            for sequence in std::iter::once(&mut sampled.frames).chain(sampled.left_handed.as_mut()) {
                if let [only] = sequence.as_mut_slice() {
                    if only.duration_ms == 0 {
                        only.duration_ms = static_delay;
                    }
                }
            }

            match sampled.left_handed {
                Some(left) => {
                    has_mirrored = true;
                    mirrored.extend(left);
                }
                None => mirrored.extend(sampled.frames.iter().cloned()),
            }
            frames.extend(sampled.frames);
        }

        Ok(Sprite {
            size: key.size,
            frames,
            left_handed: has_mirrored.then_some(mirrored),
        })
    }

    /// Renders every surviving (size, scale, frame) of `cursor` and packs
    /// them, grouped by pixel size then frame index.
    pub fn encode_cursor(&self, variant: &str, cursor: &Cursor) -> ThemeResult<Vec<u8>> {
        let jobs = raster_plan(cursor, &self.config.scales, self.config.max_pixel_size);
        if jobs.is_empty() {
            return Err(anyhow!(
                "no size of {} fits within {} pixels",
                cursor.name,
                self.config.max_pixel_size
            )
            .into());
        }

        let adapter = FrameRasterAdapter::new(self.rasterizer);
        let per_size: Vec<Vec<RasterImage>> = jobs
            .par_iter()
            .map(|job| {
                let sprite = &cursor.sprites[&job.declared];
                let label = SpriteKey::new(variant, &cursor.name, job.declared).to_string();
                sprite
                    .frames
                    .iter()
                    .enumerate()
                    .map(|(index, frame)| adapter.render(&label, job.declared, job.scale, frame, index))
                    .collect::<ThemeResult<Vec<_>>>()
            })
            .collect::<ThemeResult<_>>()?;

        let images: Vec<RasterImage> = per_size.into_iter().flatten().collect();
        Ok(to_x11(&images))
    }

    /// Full build into `output_dir`. Input errors abort with a
    /// [`ThemeError`]; a cursor that fails to render is reported and skipped.
    pub fn run(&self, catalog: &SpriteCatalog, output_dir: &Path) -> Result<BuildReport> {
        let pool = build_thread_pool(self.thread_count)?;
        pool.install(|| self.run_inner(catalog, output_dir))
    }

    fn run_inner(&self, catalog: &SpriteCatalog, output_dir: &Path) -> Result<BuildReport> {
        info!("Sampling {} sprite records", catalog.len());
        let sprites = self.build_sprites(catalog)?;
        let assembled = ThemeAssembler::new(self.config).assemble(sprites)?;

        let writer = ThemeWriter::new(output_dir);
        for plan in &assembled.variants {
            writer.prepare(plan)?;
        }

        let jobs: Vec<(&VariantPlan, &String)> = assembled
            .variants
            .iter()
            .flat_map(|plan| plan.cursors.iter().map(move |cursor| (plan, cursor)))
            .collect();
        info!(
            "Encoding {} cursors across {} variants",
            jobs.len(),
            assembled.variants.len()
        );

        let results: Vec<ThemeResult<PathBuf>> = jobs
            .par_iter()
            .map(|(plan, name)| -> ThemeResult<PathBuf> {
                let cursor = assembled
                    .cursor(&plan.name, name)
                    .ok_or_else(|| anyhow!("cursor {} vanished from variant {}", name, plan.name))?;
                let data = self.encode_cursor(&plan.name, cursor)?;
                Ok(writer.write_cursor(plan, name, &data)?)
            })
            .collect();

        let mut report = BuildReport {
            warnings: assembled.warnings.clone(),
            ..BuildReport::default()
        };
        let mut available = BTreeSet::new();
        for ((plan, name), result) in jobs.iter().zip(results) {
            match result {
                Ok(path) => {
                    available.insert((plan.slug.clone(), (*name).clone()));
                    report.written.push(path);
                }
                Err(error) if error.is_fatal() => return Err(error.into()),
                Err(error) => {
                    warn!("  ✗ {}/{}: {}", plan.name, name, error);
                    writer.remove_cursor(plan, name)?;
                    report.failures.push(CursorFailure {
                        variant: plan.name.clone(),
                        cursor: (*name).clone(),
                        error,
                    });
                }
            }
        }

        let comment = assembled.theme.comment.as_deref();
        if let Some(author) = &assembled.theme.author {
            info!("Theme author: {}", author);
        }
        for plan in &assembled.variants {
            let (links, warnings) = writer.write_links(plan, &mut available)?;
            report.links += links;
            report.warnings.extend(warnings);
            writer.write_index(plan, comment)?;
            report.variants.push(writer.variant_dir(plan));
            info!("  ✓ {} -> {}", plan.display_name, writer.variant_dir(plan).display());
        }

        if report.failures.is_empty() {
            info!(
                "Completed: {} cursors, {} links",
                report.written.len(),
                report.links
            );
        } else {
            warn!(
                "Completed with {} successes and {} failures",
                report.written.len(),
                report.failures.len()
            );
        }
        Ok(report)
    }
}

fn build_thread_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if threads > 0 {
        builder = builder.num_threads(threads);
    }
    builder.build().context("Failed to build worker thread pool")
}
