use crate::model::ThemeConfig;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub theme: ThemeConfig,
    /// Worker threads for sampling and encoding; 0 lets rayon decide.
    pub thread_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("./out"),
            theme: ThemeConfig::default(),
            thread_count: 0,
        }
    }
}
