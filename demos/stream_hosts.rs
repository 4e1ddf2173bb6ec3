use std::collections::BTreeMap;

use anyhow::Result;
use urlbits::{Options, Pipeline};

/// Counts hosts per line of stdin using the stages directly, printing every
/// dropped line as it is reported.
///
/// ```text
/// cat urls.txt | cargo run --example stream_hosts
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let options = Options {
        validate: true,
        verbose: true,
        ..Options::default()
    };

    let (mut pipeline, mut diagnostics) = Pipeline::with_diagnostics(&options);
    let lines = pipeline.lines(tokio::io::stdin());
    let uris = pipeline.parsed(lines);
    let uris = pipeline.validated(uris);
    let mut hosts = pipeline.hosts(uris);

    let dropped = tokio::spawn(async move {
        let mut count = 0;
        while let Some(diagnostic) = diagnostics.recv().await {
            println!("dropped: {:?}", diagnostic);
            count += 1;
        }
        count
    });

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    while let Some(host) = hosts.recv().await {
        *counts.entry(host).or_default() += 1;
    }

    let summary = pipeline.finish().await?;
    let dropped = dropped.await?;

    println!("\n{} hosts from {} lines ({} dropped):", counts.len(), summary.stages[0].received, dropped);
    for (host, count) in &counts {
        println!("{:>6}  {}", count, host);
    }

    Ok(())
}
