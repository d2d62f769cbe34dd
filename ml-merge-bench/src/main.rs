//! Benchmark runner for dataset merging

use ml_merge_bench::{bench_buffer, bench_split, bench_streaming, BenchConfig, BenchResult};

fn print_result(result: &BenchResult) {
    println!("\nBenchmark: {}", result.name);
    println!("  Total time:   {:?}", result.total_time);
    println!("  Average time: {:?}", result.avg_time);
    println!("  Min time:     {:?}", result.min_time);
    println!("  Max time:     {:?}", result.max_time);
    println!("  Throughput:   {:.2} datapoints/sec", result.throughput);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Dataset Merge Benchmarks ===");

    let config = BenchConfig::default();
    print_result(&bench_streaming(&config)?);
    print_result(&bench_buffer(&config)?);
    print_result(&bench_split(&config)?);

    // Scaling with the number of merged datasets
    println!("\n=== Dataset Count Scaling ===");
    for num_datasets in [2, 8, 32] {
        let config = BenchConfig {
            iterations: 3,
            warmup_iterations: 1,
            num_datasets,
            datapoints_per_dataset: 100_000 / num_datasets,
            ..BenchConfig::default()
        };

        let result = bench_split(&config)?;
        println!("\nDatasets: {num_datasets}");
        println!("  Average time: {:?}", result.avg_time);
        println!("  Throughput:   {:.2} datapoints/sec", result.throughput);
    }

    Ok(())
}
