use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::characters::{self, CharacterError, DEFAULT_SIDE};
use crate::dataset::{self, DatasetError};
use crate::evaluation::LabelFormat;
use crate::preprocess::{PreprocessError, Preprocessing};
use crate::vector::LabeledSample;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Characters(#[from] CharacterError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

/// Training and test samples ready for classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Splits {
    pub train: Vec<LabeledSample>,
    pub test: Vec<LabeledSample>,
}

/// Settings for a classification run, read from a JSON file.
///
/// Missing fields take their defaults, so `{}` is a valid file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Number of neighbors that vote.
    pub k: usize,
    /// Minkowski order.
    pub p: u32,
    pub parallel: bool,
    /// Keep only every n-th training and test sample.
    pub subsample: usize,
    pub preprocessing: Preprocessing,
    pub label_format: LabelFormat,
    pub train_images: PathBuf,
    pub train_labels: PathBuf,
    pub test_images: PathBuf,
    pub test_labels: PathBuf,
    /// Directories of labeled character images; when both are set they
    /// replace the IDX files.
    pub train_characters: Option<PathBuf>,
    pub test_characters: Option<PathBuf>,
    /// Character images are resized to `side x side`.
    pub side: u32,
    /// Where to write the JSON evaluation report, if anywhere.
    pub report_json: Option<PathBuf>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        KnnConfig {
            k: 3,
            p: 2,
            parallel: true,
            subsample: 1,
            preprocessing: Preprocessing::default(),
            label_format: LabelFormat::default(),
            train_images: PathBuf::from("data/train-images-idx3-ubyte"),
            train_labels: PathBuf::from("data/train-labels-idx1-ubyte"),
            test_images: PathBuf::from("data/t10k-images-idx3-ubyte"),
            test_labels: PathBuf::from("data/t10k-labels-idx1-ubyte"),
            train_characters: None,
            test_characters: None,
            side: DEFAULT_SIDE,
            report_json: None,
        }
    }
}

impl KnnConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: KnnConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::Invalid("k must be at least 1".into()));
        }
        if self.p == 0 {
            return Err(ConfigError::Invalid("p must be at least 1".into()));
        }
        if self.subsample == 0 {
            return Err(ConfigError::Invalid("subsample must be at least 1".into()));
        }
        if self.train_characters.is_some() != self.test_characters.is_some() {
            return Err(ConfigError::Invalid(
                "train_characters and test_characters must be set together".into(),
            ));
        }
        if self.side == 0 {
            return Err(ConfigError::Invalid("side must be at least 1".into()));
        }
        self.preprocessing
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reads the configured training and test sets, subsamples them and runs
    /// the preprocessing steps.
    pub fn load_splits(&self) -> Result<Splits, LoadError> {
        let (train, test) = match (&self.train_characters, &self.test_characters) {
            (Some(train_dir), Some(test_dir)) => {
                info!(
                    "loading characters from {} and {}",
                    train_dir.display(),
                    test_dir.display()
                );
                (
                    characters::load_directory(train_dir, self.side)?,
                    characters::load_directory(test_dir, self.side)?,
                )
            }
            _ => (
                dataset::load(&self.train_images, &self.train_labels)?,
                dataset::load(&self.test_images, &self.test_labels)?,
            ),
        };
        let train = dataset::every_nth(&train, self.subsample);
        let test = dataset::every_nth(&test, self.subsample);
        Ok(Splits {
            train: self.preprocessing.apply_all(train)?,
            test: self.preprocessing.apply_all(test)?,
        })
    }
}
