use clap::Parser;
use prjcombine_re_xilinx_interchange::annotations::Annotations;
use prjcombine_re_xilinx_interchange::db::Device;
use prjcombine_re_xilinx_xdlrc::{Options, Scope, WireIndex, generate_with_index};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "gen_xdlrc",
    about = "Generate an XDLRC resource report from an interchange device database."
)]
struct Args {
    /// Device database.
    device: PathBuf,
    family: String,
    /// Output file [default: <part>.xdlrc].
    output: Option<PathBuf>,
    /// Generate an XDLRC+ report.
    #[arg(short = 'x', long)]
    extra: bool,
    /// Tag, routed tag and cell constraint annotations (TOML).
    #[arg(long, requires = "extra")]
    annotations: Option<PathBuf>,
    /// Only report this tile.
    #[arg(short, long, conflicts_with = "prim_defs")]
    tile: Option<String>,
    /// Only report primitive definitions.
    #[arg(short, long)]
    prim_defs: bool,
    /// Wire index output [default: <output>.wires].
    #[arg(long)]
    wire_index: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let device = Device::from_file(&args.device)?;
    let annotations = match &args.annotations {
        Some(path) => Some(Annotations::from_file(path)?.validate(&device)?),
        None => None,
    };
    let scope = if args.prim_defs {
        Scope::PrimitiveDefs
    } else if let Some(tile) = args.tile {
        Scope::Tile(tile)
    } else {
        Scope::Full
    };
    let opts = Options {
        family: args.family,
        scope,
        extra: args.extra,
        annotations,
    };
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}.xdlrc", device.name)));
    let wire_index = args
        .wire_index
        .unwrap_or_else(|| WireIndex::default_path(&output));
    let report = generate_with_index(&device, &opts, &output, &wire_index)?;
    if let Some(summary) = report.summary {
        info!(
            "{tiles} tiles, {sites} sites, {pips} pips",
            tiles = summary.tiles,
            sites = summary.sites,
            pips = summary.numpips
        );
    }
    Ok(())
}
