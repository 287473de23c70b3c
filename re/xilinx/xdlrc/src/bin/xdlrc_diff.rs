use clap::Parser;
use prjcombine_re_xilinx_xdlrc::compare::compare;
use prjcombine_re_xilinx_xdlrc::parser;
use simple_error::bail;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "xdlrc_diff",
    about = "Compare a generated XDLRC report against a reference one."
)]
struct Args {
    generated: PathBuf,
    reference: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    let mut ours = parser::Parser::from_file(&args.generated)?;
    let mut theirs = parser::Parser::from_file(&args.reference)?;
    let diffs = compare(&mut ours, &mut theirs)?;
    for diff in &diffs {
        println!("{diff}");
    }
    if !diffs.is_empty() {
        bail!("{n} differences", n = diffs.len());
    }
    Ok(())
}
