//! Summation benchmark: sequential and rayon sums on the CPU, then every
//! GPU summation kernel, each checked against the reference total.

use anyhow::{ensure, Context};
use clap::Parser;

use compute::{describe_adapter, list_adapters, DeviceSelector, GpuContext, Timer};
use reduce::{random_values, sum_parallel, sum_sequential, GpuSum, ReduceError, SumConfig, SumKernel};

#[derive(Parser)]
#[command(name = "sum_bench", version, about = "Benchmark CPU and GPU u32 summation")]
struct Cli {
    /// Adapter index as printed by --list-devices (default: best available)
    #[arg(short, long)]
    device: Option<usize>,
    /// Print the available adapters and exit
    #[arg(long)]
    list_devices: bool,
    /// Number of values
    #[arg(short, long, default_value_t = 100 * 1000 * 1000)]
    n: usize,
    /// Timed iterations per implementation
    #[arg(short, long, default_value_t = 10)]
    iters: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 256)]
    work_group_size: u32,
    /// Values per thread for the loop kernels
    #[arg(long, default_value_t = 64)]
    values_per_thread: u32,
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

    let config = SumConfig {
        work_group_size: cli.work_group_size,
        values_per_thread: cli.values_per_thread,
    };
    config.validate()?;

    let values = random_values(cli.n, cli.seed);
    let reference = sum_sequential(&values);

    println!("\n==============================  CPU RESULTS ==============================\n");
    bench("CPU", cli.iters, cli.n, reference, || Ok(sum_sequential(&values)))?;
    bench("CPU rayon", cli.iters, cli.n, reference, || Ok(sum_parallel(&values)))?;

    println!("\n==============================  GPU RESULTS ==============================\n");
    let selector = cli.device.map_or(DeviceSelector::Auto, DeviceSelector::Index);
    let ctx = GpuContext::new_blocking(selector).context("failed to open a GPU device")?;
    let mut gpu = GpuSum::new(&ctx, config).context("failed to build the sum kernels")?;
    gpu.upload(&values)?;
    ctx.synchronize()?;

    for which in SumKernel::ALL {
        bench(&format!("GPU {}", which), cli.iters, cli.n, reference, || gpu.sum(which))?;
        println!();
    }
    Ok(())
}

fn bench(
    label: &str,
    iters: usize,
    n: usize,
    reference: u32,
    mut run: impl FnMut() -> reduce::Result<u32>,
) -> anyhow::Result<()> {
    let mut timer = Timer::new();
    for _ in 0..iters {
        let actual = run()?;
        if actual != reference {
            return Err(ReduceError::Mismatch {
                kernel: label.to_owned(),
                expected: reference,
                actual,
            }
            .into());
        }
        timer.next_lap();
    }
    let avg = timer.lap_avg();
    println!("{}: {:.4}+-{:.4} s", label, avg, timer.lap_std());
    if avg > 0.0 {
        println!("{}: {:.2} millions/s", label, n as f64 / 1e6 / avg);
    }
    Ok(())
}
