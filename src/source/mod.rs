// Design sources: where component records come from

pub mod exports;
#[cfg(feature = "remote")]
pub mod figma;
pub mod local;

pub use local::LocalSource;

use anyhow::Result;

use crate::catalog::ComponentRecord;

/// Yields the sprite components of a design document.
pub trait DesignSource {
    fn components(&self) -> Result<Vec<ComponentRecord>>;
}
