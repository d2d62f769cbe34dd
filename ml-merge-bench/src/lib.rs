//! Benchmarks for merging, buffering and splitting datasets

use std::sync::Arc;
use std::time::{Duration, Instant};

use ml_merge::{
    BufferConfig, BuildOptions, Dataset, DatasetCard, DatasetInfo, MergeDataset, SplitConfig,
    StreamBuilder,
};
use ml_merge_core::error::{Error, Result};
use ml_merge_core::{CategoryRegistry, InMemoryStreamBuilder};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Lightweight datapoint standing in for an annotation record
#[derive(Debug, Clone)]
pub struct Record {
    /// Index of the source dataset
    pub dataset: usize,
    /// Position inside the source dataset
    pub index: usize,
    /// Annotation label
    pub label: String,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of iterations
    pub iterations: usize,

    /// Warmup iterations
    pub warmup_iterations: usize,

    /// Number of merged datasets
    pub num_datasets: usize,

    /// Datapoints per dataset
    pub datapoints_per_dataset: usize,

    /// Held-out ratio for the split benchmark
    pub ratio: f64,

    /// Seed for shuffles and split draws
    pub seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warmup_iterations: 3,
            num_datasets: 4,
            datapoints_per_dataset: 25_000,
            ratio: 0.1,
            seed: 42,
        }
    }
}

impl BenchConfig {
    /// Datapoints processed by one iteration
    pub fn total_datapoints(&self) -> usize {
        self.num_datasets * self.datapoints_per_dataset
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Name of the benchmark
    pub name: String,

    /// Total time taken
    pub total_time: Duration,

    /// Average time per iteration
    pub avg_time: Duration,

    /// Min time per iteration
    pub min_time: Duration,

    /// Max time per iteration
    pub max_time: Duration,

    /// Throughput (datapoints/second)
    pub throughput: f64,
}

/// Run a benchmark
pub fn run_benchmark<F>(name: &str, config: &BenchConfig, func: F) -> Result<BenchResult>
where
    F: Fn() -> Result<()>,
{
    if config.iterations == 0 {
        return Err(Error::InvalidArgument(
            "At least one benchmark iteration is required".into(),
        ));
    }

    // Warmup
    for _ in 0..config.warmup_iterations {
        func()?;
    }

    let mut times = Vec::with_capacity(config.iterations);
    let start_total = Instant::now();

    for _ in 0..config.iterations {
        let start = Instant::now();
        func()?;
        times.push(start.elapsed());
    }

    let total_time = start_total.elapsed();

    let iterations = u32::try_from(times.len()).unwrap_or(u32::MAX);
    let avg_time = times.iter().sum::<Duration>() / iterations;
    let min_time = times.iter().min().copied().unwrap_or_default();
    let max_time = times.iter().max().copied().unwrap_or_default();

    #[allow(clippy::cast_precision_loss)]
    let throughput =
        (config.iterations * config.total_datapoints()) as f64 / total_time.as_secs_f64();

    debug!(benchmark = name, ?avg_time, throughput, "benchmark finished");

    Ok(BenchResult {
        name: name.to_string(),
        total_time,
        avg_time,
        min_time,
        max_time,
        throughput,
    })
}

/// Synthetic datasets sized after `config`, each with its own category
pub fn synthetic_datasets(config: &BenchConfig) -> Result<Vec<Arc<dyn Dataset<Record>>>> {
    (0..config.num_datasets)
        .map(|dataset| {
            let label = format!("category_{dataset}");
            let records = (0..config.datapoints_per_dataset)
                .map(|index| Record {
                    dataset,
                    index,
                    label: label.clone(),
                })
                .collect();
            let categories = CategoryRegistry::new().with_category(label.clone(), [label.clone()]);
            let builder: Arc<dyn StreamBuilder<Record>> =
                Arc::new(InMemoryStreamBuilder::new(records).with_categories(categories));
            let card = DatasetCard::new(DatasetInfo::new(format!("synthetic_{dataset}")), builder)?;
            Ok(Arc::new(card) as Arc<dyn Dataset<Record>>)
        })
        .collect()
}

/// Time streaming all datasets end-to-end without buffering
pub fn bench_streaming(config: &BenchConfig) -> Result<BenchResult> {
    let merged = MergeDataset::new(synthetic_datasets(config)?)?;

    run_benchmark("streaming", config, || {
        let count = merged.dataflow().build(&BuildOptions::new())?.count();
        debug!(count, "streamed datapoints");
        Ok(())
    })
}

/// Time draining and shuffling the merged stream
pub fn bench_buffer(config: &BenchConfig) -> Result<BenchResult> {
    let datasets = synthetic_datasets(config)?;
    let buffer_config = BufferConfig::default();

    run_benchmark("buffer", config, || {
        let mut merged = MergeDataset::new(datasets.clone())?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        merged.buffer_datasets_with_rng(&BuildOptions::new(), &buffer_config, &mut rng)
    })
}

/// Time buffering followed by a train/val/test split
pub fn bench_split(config: &BenchConfig) -> Result<BenchResult> {
    let datasets = synthetic_datasets(config)?;
    let buffer_config = BufferConfig::default();
    let split_config = SplitConfig::new(config.ratio, true);

    run_benchmark("buffer_and_split", config, || {
        let mut merged = MergeDataset::new(datasets.clone())?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        merged.buffer_datasets_with_rng(&BuildOptions::new(), &buffer_config, &mut rng)?;
        merged.split_datasets_with_rng(&split_config, &mut rng)
    })
}
