// src/bin/dataset_generator.rs
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use knn_classify::dataset;
use rand::{thread_rng, Rng};

#[derive(Debug)]
struct Args {
    output: String,
    train: usize,
    test: usize,
    classes: u8,
    side: usize,
}

impl Args {
    fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();

        Args {
            output: args.get(1).cloned().unwrap_or_else(|| "data".to_string()),
            train: args.get(2).and_then(|s| s.parse().ok()).unwrap_or(6000),
            test: args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1000),
            classes: args.get(4).and_then(|s| s.parse().ok()).unwrap_or(10),
            side: args.get(5).and_then(|s| s.parse().ok()).unwrap_or(28),
        }
    }
}

fn random_raster(pixels: usize, rng: &mut impl Rng) -> Vec<u8> {
    (0..pixels).map(|_| rng.gen_range(0..=255)).collect()
}

// Pixels drift up to +-noise from the class prototype.
fn noisy_copy(prototype: &[u8], noise: i16, rng: &mut impl Rng) -> Vec<u8> {
    prototype
        .iter()
        .map(|&p| (p as i16 + rng.gen_range(-noise..=noise)).clamp(0, 255) as u8)
        .collect()
}

fn generate(
    prototypes: &[Vec<u8>],
    count: usize,
    rng: &mut impl Rng,
    pb: &ProgressBar,
) -> (Vec<Vec<u8>>, Vec<u8>) {
    let mut images = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);
    for _ in 0..count {
        let label = rng.gen_range(0..prototypes.len());
        images.push(noisy_copy(&prototypes[label], 60, rng));
        labels.push(label as u8);
        pb.inc(1);
    }
    (images, labels)
}

fn write_split(dir: &Path, prefix: &str, side: usize, images: &[Vec<u8>], labels: &[u8]) -> Result<()> {
    let image_path = dir.join(format!("{}-images-idx3-ubyte", prefix));
    let label_path = dir.join(format!("{}-labels-idx1-ubyte", prefix));
    dataset::write_images(&image_path, side, side, images)
        .with_context(|| format!("writing {}", image_path.display()))?;
    dataset::write_labels(&label_path, labels)
        .with_context(|| format!("writing {}", label_path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::from_env();
    anyhow::ensure!(args.classes > 0, "at least one class is required");
    anyhow::ensure!(args.side > 0, "side must be non-zero");

    println!("Dataset Generation Tool");
    println!("--------------------");
    println!("Output directory: {}", args.output);
    println!("Training samples: {}", args.train);
    println!("Test samples: {}", args.test);
    println!("Classes: {}", args.classes);
    println!("Image side: {}", args.side);
    println!("\nUse: dataset-generator <output_dir> <train> <test> <classes> <side>");

    let output_dir = Path::new(&args.output);
    fs::create_dir_all(output_dir)?;
    let mut rng = thread_rng();

    let prototypes: Vec<Vec<u8>> = (0..args.classes)
        .map(|_| random_raster(args.side * args.side, &mut rng))
        .collect();

    let pb = ProgressBar::new((args.train + args.test) as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
        .progress_chars("=>-"));

    let (train_images, train_labels) = generate(&prototypes, args.train, &mut rng, &pb);
    write_split(output_dir, "train", args.side, &train_images, &train_labels)?;
    let (test_images, test_labels) = generate(&prototypes, args.test, &mut rng, &pb);
    write_split(output_dir, "t10k", args.side, &test_images, &test_labels)?;
    pb.finish_with_message("Dataset generation complete");

    log::info!("wrote dataset to {}", output_dir.display());
    Ok(())
}
