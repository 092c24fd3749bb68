// Library exports for figcursor

pub mod animation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod source;

pub use catalog::{ComponentRecord, SpriteCatalog};
pub use error::{ThemeError, ThemeResult};
pub use model::ThemeConfig;
pub use pipeline::{BuildReport, ResvgRasterizer, ThemeBuilder};
