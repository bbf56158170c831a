use kdsim::{Scenario, ScenarioConfig, Simulation, Snapshot, TickSummary};
use kdsim::{bench_accumulate, bench_step_curve};
use kdsim::simulation::snapshot::snapshot_dimension;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Fixed-step N-body simulation with k-d tree neighbor search")]
struct Args {
    /// Scenario file; looked up as given, then under `scenarios/`
    #[arg(short, long = "file", default_value = "cluster_2d.yaml")]
    file_name: PathBuf,

    /// Write the per-tick summaries as YAML
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Write a binary snapshot of the final state
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Continue from a snapshot instead of the scenario's initial particles
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Run the timing benchmarks and exit
    #[arg(long)]
    bench: bool,
}

fn resolve_scenario_path(file_name: &Path) -> PathBuf {
    if file_name.exists() {
        return file_name.to_path_buf();
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &Path) -> Result<ScenarioConfig> {
    let config_path = resolve_scenario_path(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;
    Ok(scenario_cfg)
}

fn run_scenario<const D: usize>(cfg: &ScenarioConfig, args: &Args) -> Result<()> {
    let scenario = Scenario::<D>::build_scenario(cfg)?;

    let mut sim = match &args.resume {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let found = snapshot_dimension(&bytes)?;
            if found != D {
                bail!("snapshot {} is {found}-dimensional, scenario is {D}-dimensional", path.display());
            }
            let snapshot = Snapshot::<D>::load(&bytes)?;
            info!(tick = snapshot.tick, path = %path.display(), "resuming from snapshot");
            Simulation::resume(scenario.engine, scenario.parameters, snapshot, scenario.forces)?
        }
        None => Simulation::from_scenario(scenario)?,
    };

    let summaries = sim.run()?;

    println!("{}", TickSummary::csv_header());
    for s in &summaries {
        println!("{}", s.csv_row());
    }

    if let Some(path) = &args.summary_out {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_yaml::to_writer(file, &summaries)?;
    }

    if let Some(path) = &args.snapshot_out {
        sim.snapshot().save(path)?;
        info!(tick = sim.tick(), path = %path.display(), "snapshot written");
    }

    Ok(())
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();

    if args.bench {
        bench_accumulate();
        bench_step_curve();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;

    match scenario_cfg.engine.dimension {
        2 => run_scenario::<2>(&scenario_cfg, &args),
        3 => run_scenario::<3>(&scenario_cfg, &args),
        d => bail!("unsupported dimension {d}; scenarios must be 2D or 3D"),
    }
}
