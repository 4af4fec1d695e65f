use clap::Parser;
use castles::pipeline::run;
use env_logger::Env;
use std::path::PathBuf;
use std::time::Instant;

/// Estimate substitution-unit branch lengths on an annotated species tree
/// from the quartet statistics on its internal nodes and a set of gene trees.
#[derive(Parser, Debug)]
#[command(name = "castles", version, about = "Species tree branch lengths in substitution units")]
struct Args {
    /// Annotated species tree file in newick format
    #[arg(short = 't', long = "speciestree")]
    speciestree: PathBuf,

    /// Gene trees file in newick format (may be .gz)
    #[arg(short = 'g', long = "genetrees")]
    genetrees: PathBuf,

    /// Output path for the species tree with SU branch lengths (.gz compresses)
    #[arg(short = 'o', long = "outputtree")]
    outputtree: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let t0 = Instant::now();
    if let Err(e) = run(&args.speciestree, &args.genetrees, &args.outputtree) {
        eprintln!("castles: {e}");
        std::process::exit(e.exit_code());
    }
    log::info!("Done in {:.3}s", t0.elapsed().as_secs_f64());
}
