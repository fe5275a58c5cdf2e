//! qadmit CLI: replay and inspect admission-control workloads.

use clap::{Parser, Subcommand};
use qadmit_core::config::PolicyConfig;
use qadmit_lock::PredicateLock;
use qadmit_sim::export::write_profiling_csv;
use qadmit_sim::{parse_yaml_workload, SimError, Simulator, Workload};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qadmit")]
#[command(about = "Predicate-lock admission control for concurrent queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a workload YAML file through the policy enforcer
    Simulate {
        /// Path to the workload YAML file
        #[arg(short, long)]
        workload: PathBuf,

        /// Record per-work-order execution times (overrides config)
        #[arg(long)]
        profile: bool,

        /// Write recorded work-order times to this CSV file
        #[arg(long)]
        profile_out: Option<PathBuf>,

        /// Maximum concurrently running queries (overrides config)
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Strategy attempts per promotion pass (overrides config)
        #[arg(long)]
        promotion_attempts: Option<u32>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a workload YAML file
    Validate {
        /// Path to the workload YAML file
        #[arg(short, long)]
        workload: PathBuf,
    },

    /// Show each query's predicate locks and which queries conflict
    Explain {
        /// Path to the workload YAML file
        #[arg(short, long)]
        workload: PathBuf,
    },
}

struct SimulateArgs {
    profile: bool,
    profile_out: Option<PathBuf>,
    max_concurrent: Option<usize>,
    promotion_attempts: Option<u32>,
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            workload,
            profile,
            profile_out,
            max_concurrent,
            promotion_attempts,
            json,
        } => {
            let args = SimulateArgs {
                profile,
                profile_out,
                max_concurrent,
                promotion_attempts,
                json,
            };
            if let Err(e) = simulate(&workload, args) {
                report_error(e.as_ref());
                std::process::exit(1);
            }
        }
        Commands::Validate { workload } => {
            if let Err(e) = validate_workload(&workload) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Workload is valid");
        }
        Commands::Explain { workload } => {
            if let Err(e) = explain_workload(&workload) {
                report_error(e.as_ref());
                std::process::exit(1);
            }
        }
    }
}

fn report_error(e: &(dyn std::error::Error + 'static)) {
    eprintln!("Error: {}", e);
    if let Some(sim) = e.downcast_ref::<SimError>() {
        for hint in sim.suggestions() {
            eprintln!("  hint: {}", hint);
        }
    }
}

fn load(path: &PathBuf) -> Result<Workload, Box<dyn std::error::Error>> {
    let yaml_content = fs::read_to_string(path)?;
    Ok(parse_yaml_workload(&yaml_content)?)
}

fn simulate(path: &PathBuf, args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let workload = load(path)?;

    let mut config = workload.config.clone().unwrap_or_else(PolicyConfig::from_env);
    if args.profile || args.profile_out.is_some() {
        config.profile_work_orders = true;
    }
    if let Some(n) = args.max_concurrent {
        config.max_concurrent_queries = n;
    }
    if let Some(n) = args.promotion_attempts {
        config.promotion_attempts = n;
    }

    let report = Simulator::new(workload).with_config(config).run()?;

    if let Some(out) = &args.profile_out {
        let file = fs::File::create(out)?;
        write_profiling_csv(file, &report.profiling)?;
    }

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("✓ Workload replayed");
    println!("  Run id: {}", report.run_id);
    println!("  Workload hash: {}", &report.workload_hash[..16]);
    println!("  Steps: {}", report.steps.len());
    println!("  Admitted: {:?}", ids(&report.admitted));
    println!("  Retired: {:?}", ids(&report.retired));
    println!("  Still running: {:?}", ids(&report.running));
    println!("  Still waiting: {:?}", ids(&report.waiting));
    println!("  Blocks added: {}", report.blocks_added);
    println!("  Strategy denials: {}", report.denials);
    if !report.operator_stats.is_empty() {
        println!();
        println!("Work-order times:");
        for (query, ops) in &report.operator_stats {
            for (op, stats) in ops {
                println!(
                    "  query {} op {}: {} work orders, total {}, mean {:.1}",
                    query,
                    op,
                    stats.count,
                    stats.total,
                    stats.mean().unwrap_or(0.0)
                );
            }
        }
    }
    if let Some(out) = &args.profile_out {
        println!();
        println!("Profiling CSV written to {}", out.display());
    }

    Ok(())
}

fn validate_workload(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let workload = load(path)?;
    let sim = Simulator::new(workload);
    let catalog = sim.build_catalog()?;
    let _handles = sim.build_handles(&catalog)?;
    Ok(())
}

fn explain_workload(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let workload = load(path)?;
    let sim = Simulator::new(workload);
    let catalog = sim.build_catalog()?;
    let handles = sim.build_handles(&catalog)?;

    let mut ids: Vec<u64> = handles.keys().copied().collect();
    ids.sort_unstable();
    let locks: Vec<(u64, PredicateLock)> = ids
        .iter()
        .map(|id| (*id, PredicateLock::from_predicates(&handles[id].predicates)))
        .collect();

    println!("Predicate Locks");
    println!("===============");
    for (id, lock) in &locks {
        println!();
        println!("Query {} (digest {}):", id, lock.digest()?.short());
        if lock.is_empty() {
            println!("  (no locks)");
        }
        for line in lock.describe(&catalog) {
            println!("  {}", line);
        }
    }

    println!();
    println!("Conflicts");
    println!("=========");
    let mut any = false;
    for (i, (a, la)) in locks.iter().enumerate() {
        for (b, lb) in &locks[i + 1..] {
            let pairs = la.conflicts(lb);
            if pairs.is_empty() {
                continue;
            }
            any = true;
            println!("  query {} <-> query {}:", a, b);
            for (x, y) in pairs {
                println!("    {}  vs  {}", x.describe(&catalog), y.describe(&catalog));
            }
        }
    }
    if !any {
        println!("  none; every query can run concurrently");
    }
    Ok(())
}

fn ids(v: &[qadmit_core::id::QueryId]) -> Vec<u64> {
    v.iter().map(|q| q.get()).collect()
}
