//! Locating the extracted dataset and the cities it covers.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix every vacant-land layer's file stem ends with.
const LAYER_SUFFIX: &str = "_VL";

/// A dataset root and the city codes with a layer underneath it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRoot {
    pub path: PathBuf,
    pub city_codes: Vec<String>,
    pub layer_files: usize,
}

/// Search candidate roots in order; the first one containing any layer wins.
pub fn discover_dataset(search_roots: &[PathBuf], extensions: &[String]) -> Option<DatasetRoot> {
    for root in search_roots {
        if !root.is_dir() {
            tracing::debug!(path = %root.display(), "search root does not exist");
            continue;
        }
        let layers = find_layers(root, extensions);
        if layers.is_empty() {
            tracing::debug!(path = %root.display(), "no vacant-land layers under search root");
            continue;
        }

        let city_codes: BTreeSet<String> = layers
            .iter()
            .filter_map(|path| city_code_of(path))
            .collect();
        tracing::info!(
            path = %root.display(),
            layers = layers.len(),
            cities = city_codes.len(),
            "dataset found"
        );
        return Some(DatasetRoot {
            path: root.clone(),
            city_codes: city_codes.into_iter().collect(),
            layer_files: layers.len(),
        });
    }
    None
}

/// All `*_VL.<ext>` files below `root`.
pub fn find_layers(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let ext_ok = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)));
            ext_ok && city_code_of(path).is_some()
        })
        .collect()
}

/// `CC` for `.../CC_VL.shp`.
pub fn city_code_of(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let code = stem.strip_suffix(LAYER_SUFFIX)?;
    (!code.is_empty()).then(|| code.to_string())
}
