mod error;
mod knn;
mod neighbor;
pub mod characters;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod preprocess;
pub mod vector;

pub use error::{InputError, Result};
pub use evaluation::{confusion_matrix, ConfusionMatrix, LabelFormat};
pub use knn::{classify, classify_all, KnnClassifier};
pub use neighbor::Neighbor;
pub use vector::{distance, DistanceCalculator, Label, LabeledSample, MinkowskiDistance, Sample};
