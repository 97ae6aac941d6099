//! Radix sort benchmark: CPU sort vs the GPU pipeline on the same keys.
//!
//! Usage:
//!   radix_bench                 # 32M keys, best adapter
//!   radix_bench --list-devices
//!   radix_bench -d 1 -n 1000000 -i 20

use anyhow::{ensure, Context};
use clap::Parser;

use compute::{describe_adapter, list_adapters, DeviceSelector, GpuContext, Timer};
use sort::data::{random_keys, DEFAULT_MAX_VALUE};
use sort::verify::check_matches;
use sort::{RadixSorter, SortConfig};

#[derive(Parser)]
#[command(name = "radix_bench", version, about = "Benchmark the GPU radix sort against a CPU sort")]
struct Cli {
    /// Adapter index as printed by --list-devices (default: best available)
    #[arg(short, long)]
    device: Option<usize>,
    /// Print the available adapters and exit
    #[arg(long)]
    list_devices: bool,
    /// Number of keys
    #[arg(short, long, default_value_t = 32 * 1024 * 1024)]
    n: usize,
    /// Timed iterations per implementation
    #[arg(short, long, default_value_t = 10)]
    iters: usize,
    /// Seed for key generation (default: n)
    #[arg(long)]
    seed: Option<u64>,
    /// Largest generated key
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE)]
    max_value: u32,
    #[arg(long, default_value_t = 128)]
    work_group_size: u32,
    #[arg(long, default_value_t = 4)]
    digit_bits: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_devices {
        for (index, info) in list_adapters().iter().enumerate() {
            println!("{}: {}", index, describe_adapter(info));
        }
        return Ok(());
    }
    ensure!(cli.iters > 0, "--iters must be at least 1");

    let config = SortConfig {
        work_group_size: cli.work_group_size,
        digit_bits: cli.digit_bits,
    };
    config.validate()?;

    let seed = cli.seed.unwrap_or(cli.n as u64);
    let keys = random_keys(cli.n, seed, cli.max_value);
    println!("Data generated for n={}!", cli.n);

    let mut cpu_sorted = Vec::new();
    let mut timer = Timer::new();
    for _ in 0..cli.iters {
        cpu_sorted = keys.clone();
        timer.restart();
        cpu_sorted.sort_unstable();
        timer.next_lap();
    }
    report("CPU", &timer, cli.n);

    let selector = cli.device.map_or(DeviceSelector::Auto, DeviceSelector::Index);
    let ctx = GpuContext::new_blocking(selector).context("failed to open a GPU device")?;
    let mut sorter = RadixSorter::new(&ctx, config).context("failed to build the radix sort kernels")?;

    let mut timer = Timer::new();
    for _ in 0..cli.iters {
        sorter.upload(&keys)?;
        ctx.synchronize()?;
        timer.restart();
        sorter.run()?;
        ctx.synchronize()?;
        timer.next_lap();
    }
    report("GPU", &timer, cli.n);

    let gpu_sorted = sorter.download()?;
    check_matches(&gpu_sorted, &cpu_sorted)?;
    println!("GPU results match CPU results");
    Ok(())
}

fn report(label: &str, timer: &Timer, n: usize) {
    let avg = timer.lap_avg();
    let std = timer.lap_std();
    println!("{}: {:.4}+-{:.4} s", label, avg, std);
    if avg > 0.0 {
        println!("{}: {:.2} millions/s", label, n as f64 / 1e6 / avg);
    }
}
