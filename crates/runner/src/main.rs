use anyhow::Context;
use clap::Parser;
use openbook_core::Config;
use openbook_features::BuilderRegistry;
use openbook_ingestion::ReplaySource;
use openbook_runner::{open_sink, GraphRunner};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Derive order-book features from a market-data feed", long_about = None)]
struct Args {
    /// JSON configuration file.
    #[arg(long, short)]
    config: PathBuf,

    /// Recorded JSON-lines events to replay; reads stdin when omitted.
    #[arg(long)]
    replay: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("openbook=info")),
        )
        .init();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let registry = BuilderRegistry::with_defaults();
    let mut runner = GraphRunner::new(config, &registry).context("building feature graph")?;
    let mut sink = open_sink(&runner.config().report).context("opening report sink")?;

    let stats = match &args.replay {
        Some(path) => {
            let mut source = ReplaySource::from_path(path)
                .with_context(|| format!("opening {}", path.display()))?;
            runner.run(&mut source, sink.as_mut())?
        }
        None => {
            let mut source = ReplaySource::new(io::stdin().lock());
            runner.run(&mut source, sink.as_mut())?
        }
    };

    info!(?stats, "Done");
    Ok(())
}
