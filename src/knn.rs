use std::borrow::Cow;
use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{InputError, Result};
use crate::neighbor::Neighbor;
use crate::vector::{DistanceCalculator, Label, LabeledSample, MinkowskiDistance, Sample};

/// Brute-force k-nearest-neighbor classifier over an owned or borrowed
/// reference set.
///
/// The reference set is validated once at construction (non-empty, uniform
/// sample length, `1 <= k <= len`); queries are only checked for length.
///
/// Ties are resolved deterministically:
/// - at the selection boundary, the reference that appears earlier in the
///   reference set wins;
/// - in the majority vote, the smallest label among those sharing the highest
///   count wins.
pub struct KnnClassifier<'a> {
    references: Cow<'a, [LabeledSample]>,
    dimension: usize,
    k: usize,
    distance_calculator: Box<dyn DistanceCalculator>,
    parallel: bool,
}

impl<'a> KnnClassifier<'a> {
    /// Accepts either a `Vec` to own or a slice to borrow.
    pub fn new<R>(references: R, k: usize, p: u32) -> Result<Self>
    where
        R: Into<Cow<'a, [LabeledSample]>>,
    {
        let metric = MinkowskiDistance::new(p)?;
        Self::with_distance(references, k, Box::new(metric))
    }

    /// Builds a classifier from separate sample and label sequences.
    pub fn from_parallel(samples: Vec<Sample>, labels: Vec<Label>, k: usize, p: u32) -> Result<Self> {
        if samples.len() != labels.len() {
            return Err(InputError::CountMismatch {
                left: samples.len(),
                right: labels.len(),
            });
        }
        let references: Vec<LabeledSample> = samples
            .into_iter()
            .zip(labels)
            .map(|(sample, label)| LabeledSample::new(label, sample))
            .collect();
        Self::new(references, k, p)
    }

    pub fn with_distance<R>(
        references: R,
        k: usize,
        distance_calculator: Box<dyn DistanceCalculator>,
    ) -> Result<Self>
    where
        R: Into<Cow<'a, [LabeledSample]>>,
    {
        let references = references.into();
        let first = references.first().ok_or(InputError::EmptyReferenceSet)?;
        if k == 0 {
            return Err(InputError::ZeroK);
        }
        if k > references.len() {
            return Err(InputError::KTooLarge {
                k,
                available: references.len(),
            });
        }
        let dimension = first.sample.len();
        if let Some(odd) = references.iter().find(|r| r.sample.len() != dimension) {
            return Err(InputError::LengthMismatch {
                expected: dimension,
                found: odd.sample.len(),
            });
        }
        Ok(KnnClassifier {
            references,
            dimension,
            k,
            distance_calculator,
            parallel: true,
        })
    }

    /// Turns rayon dispatch of `classify_all` on or off.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn references(&self) -> &[LabeledSample] {
        &self.references
    }

    pub fn check_query(&self, query: &Sample) -> Result<()> {
        if query.len() != self.dimension {
            return Err(InputError::LengthMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        Ok(())
    }

    /// The `k` nearest references to `query`, closest first.
    pub fn nearest(&self, query: &Sample) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        let mut neighbors = self.select_nearest(query);
        neighbors.sort_unstable();
        Ok(neighbors)
    }

    pub fn classify(&self, query: &Sample) -> Result<Label> {
        self.check_query(query)?;
        Ok(self.vote(query))
    }

    /// Classifies every query against the same reference set.
    ///
    /// All queries are checked before any is classified; the output holds one
    /// label per query, in query order.
    pub fn classify_all(&self, queries: &[Sample]) -> Result<Vec<Label>> {
        queries.iter().try_for_each(|q| self.check_query(q))?;
        let labels = if self.parallel {
            queries.par_iter().map(|q| self.vote(q)).collect()
        } else {
            queries.iter().map(|q| self.vote(q)).collect()
        };
        Ok(labels)
    }

    fn score(&self, query: &Sample) -> Vec<Neighbor> {
        self.references
            .iter()
            .enumerate()
            .map(|(index, reference)| {
                let dist = self
                    .distance_calculator
                    .calculate(query.values(), reference.sample.values());
                Neighbor::new(dist, reference.label, index)
            })
            .collect()
    }

    fn select_nearest(&self, query: &Sample) -> Vec<Neighbor> {
        let mut candidates = self.score(query);
        if self.k < candidates.len() {
            candidates.select_nth_unstable(self.k - 1);
            candidates.truncate(self.k);
        }
        candidates
    }

    fn vote(&self, query: &Sample) -> Label {
        let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
        for neighbor in self.select_nearest(query) {
            *counts.entry(neighbor.label).or_insert(0) += 1;
        }
        majority(&counts)
    }
}

// Ascending iteration with a strict comparison keeps the smallest label on ties.
fn majority(counts: &BTreeMap<Label, usize>) -> Label {
    let mut best_label = 0;
    let mut best_count = 0;
    for (&label, &count) in counts {
        if count > best_count {
            best_label = label;
            best_count = count;
        }
    }
    best_label
}

/// Predicts the label of `query` from its `k` nearest `references` under the
/// Minkowski distance of order `p`.
pub fn classify(query: &Sample, references: &[LabeledSample], k: usize, p: u32) -> Result<Label> {
    KnnClassifier::new(references, k, p)?
        .with_parallel(false)
        .classify(query)
}

/// Batch form of [`classify`]; the output order matches `queries`.
pub fn classify_all(queries: &[Sample], references: &[LabeledSample], k: usize, p: u32) -> Result<Vec<Label>> {
    KnnClassifier::new(references, k, p)?.classify_all(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(label: Label, values: &[f64]) -> LabeledSample {
        LabeledSample::new(label, Sample::new(values.to_vec()))
    }

    // One-dimensional references placed so their distance to the origin is
    // exactly their value.
    fn line(points: &[(Label, f64)]) -> Vec<LabeledSample> {
        points.iter().map(|&(label, x)| labeled(label, &[x])).collect()
    }

    fn origin() -> Sample {
        Sample::new(vec![0.0])
    }

    #[test]
    fn single_exact_match_returns_its_label() {
        let refs = vec![labeled(4, &[1.0, 2.0, 3.0])];
        let query = Sample::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(4, classify(&query, &refs, 1, 2).unwrap());
    }

    #[test]
    fn majority_of_three_nearest() {
        let refs = line(&[(b'A', 1.0), (b'A', 2.0), (b'A', 3.0), (b'B', 0.5), (b'B', 0.6)]);
        assert_eq!(b'B', classify(&origin(), &refs, 3, 2).unwrap());
        assert_eq!(b'A', classify(&origin(), &refs, 5, 2).unwrap());
    }

    #[test]
    fn nearest_is_sorted_and_limited_to_k() {
        let refs = line(&[(1, 3.0), (2, 1.0), (3, 2.0), (4, 0.5)]);
        let classifier = KnnClassifier::new(refs, 3, 1).unwrap();
        let nearest = classifier.nearest(&origin()).unwrap();
        let indices: Vec<usize> = nearest.iter().map(|n| n.index).collect();
        assert_eq!(vec![3, 1, 2], indices);
    }

    #[test]
    fn borrowed_references_are_not_copied() {
        let refs = line(&[(1, 1.0), (2, 2.0)]);
        let classifier = KnnClassifier::new(&refs[..], 1, 2).unwrap();
        assert_eq!(refs.as_ptr(), classifier.references().as_ptr());
        assert_eq!(1, classifier.classify(&origin()).unwrap());

        let owned = KnnClassifier::new(refs.clone(), 1, 2).unwrap();
        assert_ne!(refs.as_ptr(), owned.references().as_ptr());
    }

    #[test]
    fn large_order_still_finds_nearest() {
        let refs = line(&[(1, 20.0), (2, 10.0)]);
        assert_eq!(2, classify(&origin(), &refs, 1, 400).unwrap());
    }

    #[test]
    fn boundary_tie_prefers_earlier_reference() {
        let refs = line(&[(7, 1.0), (2, 0.1), (5, 1.0), (9, 1.0)]);
        let classifier = KnnClassifier::new(refs, 2, 2).unwrap();
        let nearest = classifier.nearest(&origin()).unwrap();
        assert_eq!(vec![1, 0], nearest.iter().map(|n| n.index).collect::<Vec<_>>());
    }

    #[test]
    fn vote_tie_prefers_smallest_label() {
        let refs = line(&[(8, 0.1), (3, 0.2), (8, 0.3), (3, 0.4)]);
        assert_eq!(3, classify(&origin(), &refs, 4, 2).unwrap());
        assert_eq!(3, classify(&origin(), &refs, 2, 2).unwrap());
    }

    #[test]
    fn k_larger_than_references_is_rejected() {
        let refs = line(&[(1, 1.0), (2, 2.0)]);
        assert_eq!(
            Err(InputError::KTooLarge { k: 3, available: 2 }),
            classify(&origin(), &refs, 3, 2)
        );
    }

    #[test]
    fn invalid_construction_is_rejected() {
        assert_eq!(
            Err(InputError::EmptyReferenceSet),
            classify(&origin(), &[], 1, 2)
        );
        let refs = line(&[(1, 1.0)]);
        assert_eq!(Err(InputError::ZeroK), classify(&origin(), &refs, 0, 2));
        assert_eq!(Err(InputError::ZeroOrder), classify(&origin(), &refs, 1, 0));

        let ragged = vec![labeled(1, &[1.0]), labeled(2, &[1.0, 2.0])];
        assert_eq!(
            Err(InputError::LengthMismatch { expected: 1, found: 2 }),
            KnnClassifier::new(ragged, 1, 2).map(|_| ())
        );
    }

    #[test]
    fn parallel_sequences_must_match_in_length() {
        let samples = vec![Sample::new(vec![1.0]), Sample::new(vec![2.0])];
        let result = KnnClassifier::from_parallel(samples, vec![1], 1, 2).map(|_| ());
        assert_eq!(Err(InputError::CountMismatch { left: 2, right: 1 }), result);
    }

    #[test]
    fn query_length_mismatch_is_rejected() {
        let refs = line(&[(1, 1.0)]);
        let query = Sample::new(vec![1.0, 2.0]);
        assert_eq!(
            Err(InputError::LengthMismatch { expected: 1, found: 2 }),
            classify(&query, &refs, 1, 2)
        );
    }

    #[test]
    fn batch_fails_without_partial_results() {
        let refs = line(&[(1, 1.0), (2, 5.0)]);
        let queries = vec![Sample::new(vec![0.0]), Sample::new(vec![0.0, 1.0])];
        assert!(classify_all(&queries, &refs, 1, 2).is_err());
    }

    #[test]
    fn batch_preserves_query_order() {
        let refs = line(&[(1, 0.0), (2, 10.0), (3, 20.0)]);
        let queries: Vec<Sample> = [19.0, 1.0, 11.0, 9.0, 21.0]
            .iter()
            .map(|&x| Sample::new(vec![x]))
            .collect();
        let expected = vec![3, 1, 2, 2, 3];
        assert_eq!(expected, classify_all(&queries, &refs, 1, 1).unwrap());

        let sequential = KnnClassifier::new(refs, 1, 1).unwrap().with_parallel(false);
        assert_eq!(expected, sequential.classify_all(&queries).unwrap());
    }
}
