// Remote design source backed by the Figma REST API

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::DesignSource;
use super::exports::{DocumentNode, collect_exports};
use crate::catalog::ComponentRecord;
use crate::error::ThemeError;
use crate::pipeline::fs_ops::{ensure_dir, write_atomic};

const API_BASE: &str = "https://api.figma.com/v1";
const USER_AGENT: &str = concat!("figcursor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
pub struct FileResponse {
    pub document: DocumentNode,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentMeta>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    images: BTreeMap<String, Option<String>>,
}

pub struct FigmaClient {
    token: String,
    base: String,
}

impl FigmaClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base: API_BASE.to_string(),
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<ureq::Response> {
        let mut request = ureq::get(url)
            .set("User-Agent", USER_AGENT)
            .set("X-Figma-Token", &self.token);
        for (key, value) in query {
            request = request.query(key, value);
        }
        ensure_success(request.call(), url)
    }

    pub fn file(&self, file_key: &str) -> Result<FileResponse> {
        let url = format!("{}/files/{}", self.base, file_key);
        info!("Fetching Figma file {}", file_key);
        self.get(&url, &[])?
            .into_json()
            .with_context(|| format!("Failed to parse response of {}", url))
    }

    /// One-time render URLs for `ids`, keyed by node id.
    pub fn image_urls(&self, file_key: &str, ids: &[String], format: &str, scale: &str) -> Result<BTreeMap<String, String>> {
        let url = format!("{}/images/{}", self.base, file_key);
        let ids = ids.join(",");
        let mut query = vec![("ids", ids.as_str()), ("format", format), ("scale", scale)];
        if format == "svg" {
            query.extend([
                ("svg_include_id", "true"),
                ("svg_simplify_stroke", "false"),
                ("use_absolute_bounds", "true"),
            ]);
        }

        let response: ImagesResponse = self
            .get(&url, &query)?
            .into_json()
            .with_context(|| format!("Failed to parse response of {}", url))?;
        if let Some(err) = response.err {
            return Err(anyhow!("Figma could not render images: {}", err));
        }

        response
            .images
            .into_iter()
            .map(|(id, url)| -> Result<(String, String)> {
                let url = url.ok_or_else(|| anyhow!("Figma returned no image for node {}", id))?;
                Ok((id, url))
            })
            .collect()
    }

    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = ensure_success(ureq::get(url).set("User-Agent", USER_AGENT).call(), url)?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .with_context(|| format!("Failed to read response of {}", url))?;
        Ok(body)
    }

    /// Downloads every export declared in the file into `output_dir`.
    /// Returns the number of files written.
    pub fn download_exports(&self, file_key: &str, output_dir: &Path) -> Result<usize> {
        let file = self.file(file_key)?;
        let batches = collect_exports(&file.document, output_dir)?;
        ensure_dir(output_dir).with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let mut written = 0;
        for (batch, targets) in &batches {
            info!(
                "Requesting {} {} exports at {}x",
                targets.len(),
                batch.format,
                batch.scale
            );
            let ids: Vec<String> = targets.iter().map(|t| t.node_id.clone()).collect();
            let urls = self.image_urls(file_key, &ids, &batch.format, &batch.scale)?;

            targets
                .par_iter()
                .map(|target| -> Result<()> {
                    let url = urls
                        .get(&target.node_id)
                        .ok_or_else(|| anyhow!("No download URL for node {}", target.node_id))?;
                    debug!("Downloading {} to {}", url, target.file.display());
                    let body = self.download(url)?;
                    if let Some(dir) = target.file.parent() {
                        ensure_dir(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
                    }
                    write_atomic(&target.file, &body)
                        .with_context(|| format!("Failed to write {}", target.file.display()))
                })
                .collect::<Result<Vec<()>>>()?;
            written += targets.len();
        }
        Ok(written)
    }
}

fn ensure_success(response: Result<ureq::Response, ureq::Error>, url: &str) -> Result<ureq::Response> {
    match response {
        Ok(r) => Ok(r),
        Err(ureq::Error::Status(status, _)) => Err(ThemeError::Remote {
            url: url.to_string(),
            status,
        }
        .into()),
        Err(e) => Err(anyhow!("HTTP request to {} failed: {}", url, e)),
    }
}

/// Sprite components of one Figma file: components whose name carries
/// `cursor=`, rendered as SVG at scale 1.
pub struct FigmaSource {
    client: FigmaClient,
    file_key: String,
}

impl FigmaSource {
    pub fn new(client: FigmaClient, file_key: impl Into<String>) -> Self {
        Self {
            client,
            file_key: file_key.into(),
        }
    }
}

/// Anything naming a cursor; incomplete property strings are rejected by
/// the catalog.
pub fn is_sprite_component(name: &str) -> bool {
    name.contains("cursor=")
}

impl DesignSource for FigmaSource {
    fn components(&self) -> Result<Vec<ComponentRecord>> {
        let file = self.client.file(&self.file_key)?;
        let components: BTreeMap<String, ComponentMeta> = file
            .components
            .into_iter()
            .filter(|(_, meta)| is_sprite_component(&meta.name))
            .collect();
        if components.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = components.keys().cloned().collect();
        let urls = self.client.image_urls(&self.file_key, &ids, "svg", "1")?;
        info!("Downloading {} sprite components", urls.len());

        components
            .into_par_iter()
            .map(|(id, meta)| -> Result<ComponentRecord> {
                let url = urls
                    .get(&id)
                    .ok_or_else(|| anyhow!("No render URL for component {}", id))?;
                let body = self.client.download(url)?;
                let svg = String::from_utf8(body).with_context(|| format!("Component {} is not UTF-8 SVG", id))?;
                Ok(ComponentRecord {
                    id,
                    name: meta.name,
                    description: meta.description,
                    svg,
                })
            })
            .collect()
    }
}
