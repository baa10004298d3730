//! Labeled character images stored one per file.
//!
//! Files are named `<prefix><label>_<index>.<ext>`, e.g. `PlateLabel7_3.png`:
//! the character right before the last underscore is the label, stored as its
//! byte code. Images are converted to 8-bit grayscale and resized to a square
//! raster so every sample has the same length.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use log::{debug, warn};
use thiserror::Error;

use crate::vector::{Label, LabeledSample, Sample};

pub const DEFAULT_SIDE: u32 = 28;

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("side length must be non-zero")]
    ZeroSide,
}

/// Extracts the label from a file name such as `PlateLabelA_12.png`.
pub fn label_from_file_name(name: &str) -> Option<Label> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let (head, index) = stem.rsplit_once('_')?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let label = head.chars().last()?;
    if label.is_ascii_graphic() {
        Some(label as u8)
    } else {
        None
    }
}

/// Decodes one image into a `side x side` grayscale sample.
pub fn load_character(path: &Path, side: u32) -> Result<Sample, CharacterError> {
    if side == 0 {
        return Err(CharacterError::ZeroSide);
    }
    let decoded = image::open(path).map_err(|source| CharacterError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let gray = decoded.to_luma8();
    let resized = imageops::resize(&gray, side, side, FilterType::Nearest);
    Ok(Sample::from_pixels(resized.as_raw()))
}

/// Loads every correctly named image in `dir`, ordered by file name.
pub fn load_directory<P: AsRef<Path>>(dir: P, side: u32) -> Result<Vec<LabeledSample>, CharacterError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut samples = Vec::with_capacity(entries.len());
    for path in entries {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match label_from_file_name(name) {
            Some(label) => samples.push(LabeledSample::new(label, load_character(&path, side)?)),
            None => warn!("skipping {}: no label in file name", path.display()),
        }
    }
    debug!("loaded {} characters from {}", samples.len(), dir.as_ref().display());
    Ok(samples)
}
