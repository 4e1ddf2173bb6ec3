use anyhow::{Context, Result};
use clap::Parser;
use tokio::fs::File;
use tracing::{debug, info};

use urlbits::cli::Args;
use urlbits::output::StdoutSink;
use urlbits::pipeline::run;
use urlbits::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let options = args.options()?;

    init_logger(options.verbose, args.log_dir.as_deref())?;
    debug!("Running with {:?}", options);

    let mut sink = StdoutSink::stdout(&options).await?;

    let summary = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("unable to open {}", path.display()))?;
            run(&options, file, &mut sink).await?
        }
        None => run(&options, tokio::io::stdin(), &mut sink).await?,
    };

    for stage in &summary.stages {
        info!(
            "{:>10}: {} received, {} emitted",
            stage.stage, stage.received, stage.emitted
        );
    }

    Ok(())
}
