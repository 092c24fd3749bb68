pub mod assembler;
pub mod fs_ops;
pub mod raster;
pub mod runner;
pub mod theme_writer;
pub mod xcursor_reader;
pub mod xcursor_writer;

pub use assembler::{AssembledTheme, ThemeAssembler, VariantPlan};
pub use raster::{Rasterizer, ResvgRasterizer};
pub use runner::{BuildReport, ThemeBuilder};
pub use theme_writer::ThemeWriter;

#[cfg(test)]
mod pipeline_test;
