use canopy::{bench_traversal, RunSummary, Scenario, ScenarioConfig};

use anyhow::{Context, Result};
use clap::Parser;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file, relative to `scenarios/`
    #[arg(short, default_value = "bh_uniform.yaml")]
    file_name: String,

    /// Run the traversal benchmark instead of a scenario
    #[arg(long)]
    bench: bool,

    /// Worker threads used by the benchmark
    #[arg(long, default_value_t = 4)]
    bench_threads: usize,
}

fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = scenarios_dir().join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let mut scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;

    // Dataset files are given relative to the scenarios directory
    if let Some(path) = scenario_cfg.dataset.file.take() {
        scenario_cfg.dataset.file = Some(scenarios_dir().join(path));
    }

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_traversal(args.bench_threads)?;
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let scenario = Scenario::build_scenario(&scenario_cfg)?;
    let (summary, tree) = scenario.run()?;

    println!(
        "tree: {} points, {} nodes, {} leaves, depth {}",
        tree.num_points, tree.num_nodes, tree.num_leaf_nodes, tree.max_depth
    );

    match &summary {
        RunSummary::BarnesHut(report) => {
            for (i, acc) in report.results.iter().take(5).enumerate() {
                println!("query {i}: acc = [{:.6e}, {:.6e}, {:.6e}]", acc.x, acc.y, acc.z);
            }
            for w in &report.workers {
                println!(
                    "worker {}: queries {:?}, passes {}, leaf items {}, branch items {}, batches {}",
                    w.tid,
                    w.queries,
                    w.traversal.passes,
                    w.traversal.leaf_items,
                    w.traversal.branch_items,
                    w.dispatch.batches_submitted
                );
            }
        }
        RunSummary::Knn(report) => {
            for (i, set) in report.results.iter().take(5).enumerate() {
                println!("query {i}: nearest = {:?}", set.distances());
            }
            for w in &report.workers {
                println!(
                    "worker {}: queries {:?}, rounds {}, leaves {}, batches {}",
                    w.tid, w.queries, w.traversal.passes, w.traversal.leaf_items, w.dispatch.batches_submitted
                );
            }
        }
    }

    println!("{} queries in {:.3?}", summary.len(), summary.elapsed());

    Ok(())
}
