// Frame rasterization and conversion to the cursor pixel convention

use anyhow::{Context, Result, anyhow};
use image::RgbaImage;

use crate::error::{ThemeError, ThemeResult};
use crate::model::{Frame, Hotspot};

/// Renders vector markup to straight-alpha RGBA.
pub trait Rasterizer: Send + Sync {
    /// `scale` multiplies the document's intrinsic size, so a 24 unit sprite
    /// at scale 2 comes back as 48x48.
    fn rasterize(&self, svg: &str, scale: u32) -> Result<RgbaImage>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResvgRasterizer;

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, scale: u32) -> Result<RgbaImage> {
        let options = usvg::Options::default();
        let tree = usvg::Tree::from_str(svg, &options).context("Failed to parse SVG snapshot")?;

        let size = tree.size();
        let width = (size.width() * scale as f32).round() as u32;
        let height = (size.height() * scale as f32).round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("Cannot allocate a {}x{} pixmap", width, height))?;

        let transform = tiny_skia::Transform::from_scale(scale as f32, scale as f32);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        RgbaImage::from_raw(width, height, data).ok_or_else(|| anyhow!("Pixmap size mismatch"))
    }
}

/// One encoded-ready image: BGRA, premultiplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Pixel size, i.e. declared size times scale.
    pub size: u32,
    pub hotspot: Hotspot,
    pub pixels: Vec<u8>,
    pub delay_ms: u32,
    pub frame: usize,
}

pub struct FrameRasterAdapter<'a> {
    rasterizer: &'a dyn Rasterizer,
}

impl<'a> FrameRasterAdapter<'a> {
    pub fn new(rasterizer: &'a dyn Rasterizer) -> Self {
        Self { rasterizer }
    }

    pub fn render(
        &self,
        sprite: &str,
        declared: u32,
        scale: u32,
        frame: &Frame,
        index: usize,
    ) -> ThemeResult<RasterImage> {
        let expected = declared * scale;
        let image = self
            .rasterizer
            .rasterize(&frame.svg, scale)
            .with_context(|| format!("Failed to rasterize {} frame {} at {}x", sprite, index, scale))?;

        if image.width() != expected || image.height() != expected {
            return Err(ThemeError::BadRender {
                sprite: sprite.to_string(),
                scale,
                expected,
                width: image.width(),
                height: image.height(),
            });
        }

        let hotspot = frame.hotspot.scaled(scale);
        let last = expected.saturating_sub(1);
        Ok(RasterImage {
            size: expected,
            hotspot: Hotspot::new(hotspot.x.min(last), hotspot.y.min(last)),
            pixels: premultiply_alpha(&image),
            delay_ms: frame.duration_ms,
            frame: index,
        })
    }
}

/// Straight RGBA to premultiplied BGRA, rounding to nearest.
pub fn premultiply_alpha(image: &RgbaImage) -> Vec<u8> {
    let mut result = Vec::with_capacity((image.width() * image.height() * 4) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let pre = |c: u8| ((u32::from(c) * u32::from(a) + 127) / 255) as u8;
        result.extend_from_slice(&[pre(b), pre(g), pre(r), a]);
    }
    result
}
