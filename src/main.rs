use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use knn_classify::config::KnnConfig;
use knn_classify::{confusion_matrix, KnnClassifier, Label, Sample};
use log::info;

const CHUNK_SIZE: usize = 256;

#[derive(Debug)]
struct Args {
    config: Option<String>,
}

impl Args {
    fn from_env() -> Self {
        Args {
            config: std::env::args().nth(1),
        }
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

fn classify_with_progress(classifier: &KnnClassifier<'_>, queries: &[Sample]) -> Result<Vec<Label>> {
    for query in queries {
        classifier.check_query(query)?;
    }
    let pb = progress_bar(queries.len())?;
    let mut predicted = Vec::with_capacity(queries.len());
    for chunk in queries.chunks(CHUNK_SIZE) {
        predicted.extend(classifier.classify_all(chunk)?);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("classification complete");
    Ok(predicted)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::from_env();

    let config = match &args.config {
        Some(path) => KnnConfig::from_file(path).with_context(|| format!("loading config {}", path))?,
        None => KnnConfig::default(),
    };

    println!("k-NN Classifier");
    println!("--------------------");
    println!("Neighbors (k): {}", config.k);
    println!("Minkowski order (p): {}", config.p);
    println!("Parallel: {}", config.parallel);
    println!("Preprocessing: {:?}", config.preprocessing);
    match (&config.train_characters, &config.test_characters) {
        (Some(train), Some(test)) => println!(
            "Characters: {} / {} at {}x{}",
            train.display(),
            test.display(),
            config.side,
            config.side
        ),
        _ => println!("IDX files: {} / {}", config.train_images.display(), config.test_images.display()),
    }
    println!("\nUse: knn-classify [config.json]");

    let start = Instant::now();
    let splits = config.load_splits().context("loading samples")?;
    let (train, test) = (splits.train, splits.test);
    info!(
        "loaded {} training and {} test samples in {:?}",
        train.len(),
        test.len(),
        start.elapsed()
    );

    let (queries, truth): (Vec<Sample>, Vec<Label>) =
        test.into_iter().map(|s| (s.sample, s.label)).unzip();

    let classifier = KnnClassifier::new(train, config.k, config.p)
        .context("building classifier")?
        .with_parallel(config.parallel);

    let start = Instant::now();
    let predicted = classify_with_progress(&classifier, &queries)?;
    let elapsed = start.elapsed();
    info!(
        "classified {} samples in {:?} ({:.2} per second)",
        predicted.len(),
        elapsed,
        predicted.len() as f64 / elapsed.as_secs_f64()
    );

    let matrix = confusion_matrix(&truth, &predicted)?;
    println!();
    println!(
        "For a k-NN classifier using {} neighbors and a Minkowski distance of order {}",
        config.k, config.p
    );
    print!("{}", matrix.display(config.label_format));
    println!("Error rate: {:.2}%", matrix.error_rate() * 100.0);

    if let Some(path) = &config.report_json {
        let json = serde_json::to_string_pretty(&matrix.report())?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
