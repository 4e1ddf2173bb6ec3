//! Staged extraction pipeline.
//!
//! ```text
//! lines → parsed → [validated] → projection → [keys | values] → sink
//! ```
//!
//! Every stage is its own tokio task that reads from the previous stage's
//! bounded queue and owns the queue it writes to. A stage finishes when its
//! input closes and then drops its sender, which is how completion travels
//! downstream. No stage touches another stage's state.

mod diagnostics;
mod projections;
mod source;
mod stages;

use std::io;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::config::{Mode, Options};
use crate::output::OutputSink;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use projections::{project_host, project_path, project_query_map, project_record, project_user};
pub use stages::validate;

/// Per-stage record counts, returned by each stage task when it finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub received: usize,
    pub emitted: usize,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            received: 0,
            emitted: 0,
        }
    }
}

/// Reports from every stage of a finished run, in the order they were built
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub stages: Vec<StageReport>,
}

impl RunSummary {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == name)
    }

    /// Records emitted by the last stage, i.e. what reached the output
    pub fn emitted(&self) -> usize {
        self.stages.last().map_or(0, |report| report.emitted)
    }
}

/// Builder and owner of the stage tasks for one run
#[derive(Debug)]
pub struct Pipeline {
    options: Options,
    diagnostics: Diagnostics,
    source: Option<JoinHandle<io::Result<StageReport>>>,
    stages: Vec<JoinHandle<StageReport>>,
}

impl Pipeline {
    pub fn new(options: &Options) -> Self {
        Self::with_handle(options, Diagnostics::new(options.verbose))
    }

    /// Creates a pipeline whose dropped-record reports are also delivered
    /// on the returned receiver
    pub fn with_diagnostics(options: &Options) -> (Self, mpsc::UnboundedReceiver<Diagnostic>) {
        let (diagnostics, rx) = Diagnostics::subscribed(options.verbose);
        (Self::with_handle(options, diagnostics), rx)
    }

    fn with_handle(options: &Options, diagnostics: Diagnostics) -> Self {
        Self {
            options: options.clone(),
            diagnostics,
            source: None,
            stages: Vec::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn channel<T>(&self) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
        mpsc::channel(self.options.queue_capacity.max(1))
    }

    /// Starts the line source over `reader`
    pub fn lines<R>(&mut self, reader: R) -> mpsc::Receiver<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = self.channel();
        self.source = Some(tokio::spawn(source::read_lines(reader, tx)));
        rx
    }

    /// Spawns a stage applying `f` to every input record and forwarding
    /// whatever it yields, in order
    ///
    /// `f` returning `None` (or an empty iterator) drops the record. The
    /// stage stops early if its consumer goes away.
    pub(crate) fn spawn_stage<I, O, It, F>(
        &mut self,
        name: &'static str,
        mut input: mpsc::Receiver<I>,
        mut f: F,
    ) -> mpsc::Receiver<O>
    where
        I: Send + 'static,
        O: Send + 'static,
        It: IntoIterator<Item = O>,
        It::IntoIter: Send,
        F: FnMut(I) -> It + Send + 'static,
    {
        let (tx, rx) = self.channel();
        let handle = tokio::spawn(async move {
            let mut report = StageReport::new(name);
            debug!("Stage {} started", name);

            'records: while let Some(record) = input.recv().await {
                report.received += 1;
                for output in f(record) {
                    if tx.send(output).await.is_err() {
                        debug!("Stage {} consumer dropped, stopping", name);
                        break 'records;
                    }
                    report.emitted += 1;
                }
            }

            debug!(
                "Stage {} finished: {} received, {} emitted",
                name, report.received, report.emitted
            );
            report
        });
        self.stages.push(handle);
        rx
    }

    /// Waits for every stage to finish
    ///
    /// A read error in the line source is the one fatal condition of a run
    /// and is returned here.
    pub async fn finish(mut self) -> Result<RunSummary> {
        let source = match self.source.take() {
            Some(handle) => Some(handle.await.context("line source task failed")?),
            None => None,
        };

        let mut summary = RunSummary::default();
        for result in join_all(self.stages).await {
            summary.stages.push(result.context("pipeline stage task failed")?);
        }

        if let Some(source) = source {
            summary.stages.insert(0, source.context("reading input failed")?);
        }
        Ok(summary)
    }
}

/// Runs the whole pipeline over `reader` for the configured mode, writing
/// every projected record to `sink`
#[instrument(level = "debug", skip_all, fields(mode = ?options.mode))]
pub async fn run<R, P, M>(options: &Options, reader: R, sink: &mut OutputSink<P, M>) -> Result<RunSummary>
where
    R: AsyncRead + Unpin + Send + 'static,
    P: AsyncWrite + Unpin,
    M: AsyncWrite + Unpin,
{
    let mut pipeline = Pipeline::new(options);
    let lines = pipeline.lines(reader);
    let uris = pipeline.parsed(lines);
    let uris = pipeline.validated(uris);

    match options.mode {
        Mode::Domains => sink.drain(pipeline.hosts(uris)).await?,
        Mode::Keys => {
            let maps = pipeline.query_maps(uris);
            sink.drain(pipeline.keys(maps)).await?
        }
        Mode::KeyValues => sink.drain(pipeline.query_maps(uris)).await?,
        Mode::Paths => sink.drain(pipeline.paths(uris)).await?,
        Mode::User => sink.drain(pipeline.users(uris)).await?,
        Mode::Values => {
            let maps = pipeline.query_maps(uris);
            sink.drain(pipeline.values(maps)).await?
        }
        Mode::Full => sink.drain(pipeline.records(uris)).await?,
    }
    sink.flush().await?;

    let summary = pipeline.finish().await?;
    info!(
        "Run complete: {} records written, {} mirror write failures",
        summary.emitted(),
        sink.mirror_failures()
    );
    Ok(summary)
}
