// Export settings of a design document, grouped into download batches

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::animation::transform::format_number;
use crate::error::{ThemeError, ThemeResult};

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "exportSettings")]
    pub export_settings: Vec<ExportSetting>,
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSetting {
    #[serde(default)]
    pub suffix: String,
    pub format: String,
    pub constraint: ExportConstraint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConstraint {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: f64,
}

/// Nodes rendered together with one request: same format, same scale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExportBatch {
    /// Lower case, as used in file names and requests.
    pub format: String,
    pub scale: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub node_id: String,
    pub file: PathBuf,
}

/// Walks `root` and plans every export into `output_dir`. Scale 1 lands
/// directly in `output_dir`, any other scale in a `<scale>x` subdirectory.
///
/// Two nodes producing the same file name within one batch are rejected
/// before anything is requested.
pub fn collect_exports(
    root: &DocumentNode,
    output_dir: &Path,
) -> ThemeResult<BTreeMap<ExportBatch, Vec<ExportTarget>>> {
    let mut batches: BTreeMap<ExportBatch, Vec<ExportTarget>> = BTreeMap::new();
    let mut owners: BTreeMap<(ExportBatch, String), String> = BTreeMap::new();

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for setting in &node.export_settings {
            let format = setting.format.to_lowercase();
            let file_name = if setting.suffix.is_empty() {
                format!("{}.{}", node.name, format)
            } else {
                format!("{}_{}.{}", node.name, setting.suffix, format)
            };
            let batch = ExportBatch {
                format,
                scale: format_number(setting.constraint.value),
            };

            let key = (batch.clone(), file_name.clone());
            if let Some(first) = owners.get(&key) {
                return Err(ThemeError::ExportConflict {
                    first: first.clone(),
                    second: node.id.clone(),
                    file_name,
                    format: batch.format,
                    scale: batch.scale,
                });
            }
            owners.insert(key, node.id.clone());

            let dir = if batch.scale == "1" {
                output_dir.to_path_buf()
            } else {
                output_dir.join(format!("{}x", batch.scale))
            };
            batches.entry(batch).or_default().push(ExportTarget {
                node_id: node.id.clone(),
                file: dir.join(file_name),
            });
        }
        // reversed so siblings are visited in document order
        stack.extend(node.children.iter().rev());
    }

    Ok(batches)
}
