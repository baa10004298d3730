use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use knn_classify::{confusion_matrix, DistanceCalculator, KnnClassifier, Label, LabeledSample, MinkowskiDistance, Sample};
use rand::Rng;

const CLASSES: u8 = 10;
const NOISE: f64 = 40.0;

fn generate_prototype(dim: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(0.0..255.0)).collect()
}

fn generate_sample(prototype: &[f64]) -> Sample {
    let mut rng = rand::thread_rng();
    Sample::new(prototype.iter().map(|p| p + rng.gen_range(-NOISE..NOISE)).collect())
}

// Full sort of every reference, used to cross-check the partial selection.
fn calculate_ground_truth(query: &Sample, references: &[LabeledSample], k: usize, p: u32) -> Vec<usize> {
    let metric = MinkowskiDistance::new(p).expect("p is positive");
    let mut distances: Vec<(usize, f64)> = references
        .iter()
        .enumerate()
        .map(|(i, r)| (i, metric.calculate(query.values(), r.sample.values())))
        .collect();
    distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    distances.into_iter().take(k).map(|(i, _)| i).collect()
}

fn main() {
    let n_references = 20_000;
    let dim = 28 * 28;
    let n_queries = 500;
    let k = 5;
    let p = 2;

    println!("=== k-NN Classifier Performance Test ===");
    println!("Parameters:");
    println!("  References: {}", n_references);
    println!("  Dimensions: {}", dim);
    println!("  Queries: {}", n_queries);
    println!("  k: {}", k);
    println!("  p: {}", p);

    let prototypes: Vec<Vec<f64>> = (0..CLASSES).map(|_| generate_prototype(dim)).collect();

    println!("\nGenerating {} reference samples...", n_references);
    let pb = ProgressBar::new(n_references as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap()
        .progress_chars("=>-"));

    let mut rng = rand::thread_rng();
    let mut references = Vec::with_capacity(n_references);
    for _ in 0..n_references {
        let label = rng.gen_range(0..CLASSES);
        references.push(LabeledSample::new(label, generate_sample(&prototypes[label as usize])));
        pb.inc(1);
    }
    pb.finish_with_message("Reference generation complete");

    let mut queries = Vec::with_capacity(n_queries);
    let mut truth: Vec<Label> = Vec::with_capacity(n_queries);
    for _ in 0..n_queries {
        let label = rng.gen_range(0..CLASSES);
        queries.push(generate_sample(&prototypes[label as usize]));
        truth.push(label);
    }

    let classifier = match KnnClassifier::new(&references[..], k, p) {
        Ok(c) => c,
        Err(e) => {
            println!("Error building classifier: {}", e);
            return;
        }
    };

    println!("\nSequential classification...");
    let classifier = classifier.with_parallel(false);
    let start = Instant::now();
    let sequential = classifier.classify_all(&queries).expect("queries match reference length");
    let sequential_time = start.elapsed();

    println!("Parallel classification...");
    let classifier = classifier.with_parallel(true);
    let start = Instant::now();
    let parallel = classifier.classify_all(&queries).expect("queries match reference length");
    let parallel_time = start.elapsed();

    println!("\nChecking partial selection against a full sort...");
    let pb = ProgressBar::new(n_queries as u64);
    let mut mismatches = 0;
    for query in &queries {
        let selected: Vec<usize> = classifier
            .nearest(query)
            .expect("query matches reference length")
            .iter()
            .map(|n| n.index)
            .collect();
        if selected != calculate_ground_truth(query, &references, k, p) {
            mismatches += 1;
        }
        pb.inc(1);
    }
    pb.finish();

    let matrix = confusion_matrix(&truth, &parallel).expect("one prediction per query");

    println!("\nPerformance Metrics:");
    println!("  Sequential: {:?} ({:.2} queries/s)", sequential_time,
             n_queries as f64 / sequential_time.as_secs_f64());
    println!("  Parallel:   {:?} ({:.2} queries/s)", parallel_time,
             n_queries as f64 / parallel_time.as_secs_f64());
    println!("  Speedup: {:.2}x", sequential_time.as_secs_f64() / parallel_time.as_secs_f64());
    println!("  Parallel output identical: {}", sequential == parallel);
    println!("  Selection mismatches: {}", mismatches);
    println!("  Accuracy: {:.4}", matrix.accuracy());

    let memory_per_sample = dim * std::mem::size_of::<f64>();
    println!("\nMemory Usage Estimation:");
    println!("  Per sample: {} bytes", memory_per_sample);
    println!("  Reference set: {:.2} MB", (memory_per_sample * n_references) as f64 / 1024.0 / 1024.0);
}
