use clap::Parser;
use prjcombine_re_toolchain::Toolchain;
use prjcombine_re_xilinx_xdlrc::WireIndex;
use prjcombine_re_xilinx_xdlrc_verify::{
    OutputFormat, ReferenceDump, check_tile_order, find_node_mismatches, write_mismatches,
};
use simple_error::bail;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "verify_xdlrc_nodes",
    about = "List XDLRC wires written without a node that the reference device routes."
)]
struct Args {
    /// Wire index written next to the report.
    wire_index: PathBuf,
    /// Mismatch listing output.
    output: PathBuf,
    /// Toolchain description used to run Vivado.
    #[arg(long, requires_all = ["project", "run"], conflicts_with = "dump")]
    toolchain: Option<PathBuf>,
    /// Vivado project with a completed implementation run.
    #[arg(long)]
    project: Option<String>,
    /// Implementation run name.
    #[arg(long)]
    run: Option<String>,
    /// Previously saved reference dump.
    #[arg(long)]
    dump: Option<PathBuf>,
    /// Save the Vivado reference dump here.
    #[arg(long, requires = "toolchain")]
    save_dump: Option<PathBuf>,
    /// Write a comma-separated JSON fragment instead of one wire per line.
    #[arg(long)]
    json: bool,
    /// Check every wire of the index, not only the ones written without a node.
    #[arg(long)]
    all_wires: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let index = WireIndex::from_file(&args.wire_index)?;
    let dump = if let Some(path) = &args.dump {
        ReferenceDump::from_file(path)?
    } else if let Some(tc) = &args.toolchain {
        let (Some(project), Some(run)) = (&args.project, &args.run) else {
            bail!("--toolchain needs --project and --run");
        };
        let tc = Toolchain::from_file(tc)?;
        let dump = ReferenceDump::from_vivado(&tc, project, run)?;
        if let Some(path) = &args.save_dump {
            dump.to_file(path)?;
        }
        dump
    } else {
        bail!("either --dump or --toolchain is required");
    };
    if let Some(tile) = check_tile_order(&dump, &index) {
        warn!("tile {tile} is out of reference order; wires after it may go unchecked");
    }
    let check = if args.all_wires {
        find_node_mismatches(&dump, index.entries())
    } else {
        find_node_mismatches(&dump, index.nodeless())
    };
    let format = if args.json {
        OutputFormat::JsonFragment
    } else {
        OutputFormat::Lines
    };
    write_mismatches(&args.output, &check.mismatches, format)?;
    info!(
        "checked {n} wires: {m} mismatches, {u} unchecked",
        n = check.checked,
        m = check.mismatches.len(),
        u = check.unconsumed
    );
    Ok(())
}
