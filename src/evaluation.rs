//! Confusion matrix and the accuracy figures derived from it.
//!
//! Rows are true labels and columns are predicted labels, both over the
//! ascending set of labels observed in either sequence.
//!
//! ```
//! use knn_classify::confusion_matrix;
//!
//! let matrix = confusion_matrix(&[1, 1, 2], &[1, 2, 2]).unwrap();
//! assert_eq!(1, matrix.count(1, 2));
//! assert!((matrix.accuracy() - 2.0 / 3.0).abs() < 1e-12);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, Result};
use crate::vector::Label;

/// How labels are rendered in the printed table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFormat {
    /// The label's numeric value.
    Numeric,
    /// The character `label + offset`; an offset of 48 prints digits as '0'..'9'.
    Ascii { offset: u8 },
}

impl Default for LabelFormat {
    fn default() -> Self {
        LabelFormat::Ascii { offset: b'0' }
    }
}

impl LabelFormat {
    pub fn render(&self, label: Label) -> String {
        match *self {
            LabelFormat::Numeric => label.to_string(),
            LabelFormat::Ascii { offset } => char::from(label.wrapping_add(offset)).to_string(),
        }
    }
}

/// Accumulates (true, predicted) pairs one at a time.
#[derive(Clone, Debug, Default)]
pub struct ConfusionMatrixBuilder {
    cells: BTreeMap<(Label, Label), usize>,
}

impl ConfusionMatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, true_label: Label, predicted_label: Label) {
        *self.cells.entry((true_label, predicted_label)).or_insert(0) += 1;
    }

    pub fn finish(self) -> ConfusionMatrix {
        let labels: Vec<Label> = self
            .cells
            .keys()
            .flat_map(|&(t, p)| [t, p])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
        for ((t, p), n) in self.cells {
            // Both labels were collected from the same keys.
            if let (Ok(row), Ok(col)) = (labels.binary_search(&t), labels.binary_search(&p)) {
                counts[row][col] = n;
            }
        }
        ConfusionMatrix { labels, counts }
    }
}

/// A finished, read-only confusion matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    labels: Vec<Label>,
    counts: Vec<Vec<usize>>,
}

/// Compares predictions against ground truth, index by index.
pub fn confusion_matrix(true_labels: &[Label], predicted_labels: &[Label]) -> Result<ConfusionMatrix> {
    if true_labels.len() != predicted_labels.len() {
        return Err(InputError::CountMismatch {
            left: true_labels.len(),
            right: predicted_labels.len(),
        });
    }
    let mut builder = ConfusionMatrixBuilder::new();
    for (&t, &p) in true_labels.iter().zip(predicted_labels) {
        builder.record(t, p);
    }
    Ok(builder.finish())
}

impl ConfusionMatrix {
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    fn position(&self, label: Label) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    pub fn count(&self, true_label: Label, predicted_label: Label) -> usize {
        match (self.position(true_label), self.position(predicted_label)) {
            (Some(row), Some(col)) => self.counts[row][col],
            _ => 0,
        }
    }

    /// Number of samples whose true label is `label`.
    pub fn row_sum(&self, label: Label) -> usize {
        self.position(label)
            .map(|row| self.counts[row].iter().sum())
            .unwrap_or(0)
    }

    /// Number of samples predicted as `label`.
    pub fn column_sum(&self, label: Label) -> usize {
        self.position(label)
            .map(|col| self.counts.iter().map(|row| row[col]).sum())
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.iter().enumerate().map(|(i, row)| row[i]).sum()
    }

    /// Fraction of samples on the diagonal; 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    pub fn error_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            1.0 - self.accuracy()
        }
    }

    pub fn precision(&self, label: Label) -> f64 {
        ratio(self.count(label, label), self.column_sum(label))
    }

    pub fn recall(&self, label: Label) -> f64 {
        ratio(self.count(label, label), self.row_sum(label))
    }

    pub fn report(&self) -> EvaluationReport {
        let classes = self
            .labels
            .iter()
            .map(|&label| ClassReport {
                label,
                support: self.row_sum(label),
                predicted: self.column_sum(label),
                correct: self.count(label, label),
                precision: self.precision(label),
                recall: self.recall(label),
            })
            .collect();
        EvaluationReport {
            total: self.total(),
            correct: self.correct(),
            accuracy: self.accuracy(),
            error_rate: self.error_rate(),
            classes,
        }
    }

    /// Table view rendering labels with `format`.
    pub fn display(&self, format: LabelFormat) -> MatrixDisplay<'_> {
        MatrixDisplay { matrix: self, format }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display(LabelFormat::Numeric))
    }
}

pub struct MatrixDisplay<'a> {
    matrix: &'a ConfusionMatrix,
    format: LabelFormat,
}

impl fmt::Display for MatrixDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.matrix;
        let names: Vec<String> = m.labels.iter().map(|&l| self.format.render(l)).collect();
        let widest_count = m.counts.iter().flatten().max().copied().unwrap_or(0).to_string().len();
        let widest_name = names.iter().map(|n| n.chars().count()).max().unwrap_or(1);
        let width = widest_count.max(widest_name).max(3);

        writeln!(f, "Confusion matrix (rows = true, columns = predicted)")?;
        write!(f, "{:>w$} |", "", w = widest_name)?;
        for name in &names {
            write!(f, " {:>w$}", name, w = width)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", "-".repeat(widest_name + 2 + names.len() * (width + 1)))?;
        for (name, row) in names.iter().zip(&m.counts) {
            write!(f, "{:>w$} |", name, w = widest_name)?;
            for count in row {
                write!(f, " {:>w$}", count, w = width)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "Total samples: {}", m.total())?;
        writeln!(f, "Correct: {}", m.correct())?;
        writeln!(f, "Accuracy: {:.4}", m.accuracy())
    }
}

/// Per-label statistics derived from a [`ConfusionMatrix`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: Label,
    pub support: usize,
    pub predicted: usize,
    pub correct: usize,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub error_rate: f64,
    pub classes: Vec<ClassReport>,
}
