use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use job_resources::error::Result;
use job_resources::{load_cluster, load_job_resources, logger};

/// Builds the resource-allocation descriptor of a job and prints its layout
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the cluster registry (JSON)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    cluster: PathBuf,

    /// Path to the placement decision (JSON)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    allocation: PathBuf,

    /// Nodes to release after building, as a hostlist expression
    #[arg(short, long)]
    release: Option<String>,

    /// Print the descriptor snapshot as JSON instead of the summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn run(args: &Args) -> Result<()> {
    let cluster = load_cluster(&args.cluster)?;
    let mut job_resources = load_job_resources(&cluster, &args.allocation)?;

    if let Some(release) = &args.release {
        log::info!("Releasing '{}' from '{}'.", release, job_resources.nodes());
        job_resources.release_node_names(&cluster, release)?;
        job_resources.ensure_valid_against(&cluster)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&job_resources.to_dto())?);
        return Ok(());
    }

    println!("{}", job_resources);
    for node in job_resources.node_allocations(&cluster)? {
        println!(
            "  Node={} CPU_IDs={} CPUs={}/{} Mem={}/{}",
            node.name, node.cpu_ids, node.cpus_used, node.cpus, node.memory_used, node.memory_allocated
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
