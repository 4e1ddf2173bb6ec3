use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stdout};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Options;
use crate::uri::{QueryMap, Userinfo};

/// Turns a projected record into its single output line
pub trait Render {
    fn render(self) -> serde_json::Result<String>;
}

impl Render for String {
    fn render(self) -> serde_json::Result<String> {
        Ok(self)
    }
}

impl Render for Userinfo {
    fn render(self) -> serde_json::Result<String> {
        Ok(self.to_string())
    }
}

impl Render for QueryMap {
    fn render(self) -> serde_json::Result<String> {
        serde_json::to_string(&self)
    }
}

/// Single writer for a run's results
///
/// Every line goes to the primary writer and, when saving, to the mirror.
/// The primary writer failing ends the run. The mirror is flushed after every
/// line so that a failure is logged and counted against the line that caused
/// it, and the run carries on.
#[derive(Debug)]
pub struct OutputSink<P, M> {
    primary: P,
    mirror: Option<M>,
    written: usize,
    mirror_failures: usize,
}

pub type StdoutSink = OutputSink<BufWriter<Stdout>, File>;

impl StdoutSink {
    /// Standard output, mirrored to `options.output` when `options.save` is set
    ///
    /// The mirror file is created (or truncated) up front so that a bad path
    /// fails the run before any input is read.
    pub async fn stdout(options: &Options) -> Result<Self> {
        let mirror = if options.save {
            Some(create_results_file(&options.output).await?)
        } else {
            None
        };
        Ok(Self::new(BufWriter::new(tokio::io::stdout()), mirror))
    }
}

async fn create_results_file(path: &Path) -> Result<File> {
    let file = File::create(path)
        .await
        .with_context(|| format!("unable to create file {}", path.display()))?;
    info!("Saving results to {}", path.display());
    Ok(file)
}

impl<P, M> OutputSink<P, M>
where
    P: AsyncWrite + Unpin,
    M: AsyncWrite + Unpin,
{
    pub fn new(primary: P, mirror: Option<M>) -> Self {
        Self {
            primary,
            mirror,
            written: 0,
            mirror_failures: 0,
        }
    }

    /// Writes every record from `records` until the queue closes
    ///
    /// Output is flushed whenever the queue is momentarily empty, so a slow
    /// input still shows results as they arrive.
    pub async fn drain<T: Render>(&mut self, mut records: mpsc::Receiver<T>) -> Result<()> {
        while let Some(record) = records.recv().await {
            match record.render() {
                Ok(line) => self.write_line(&line).await?,
                Err(e) => error!("unable to marshal data: {}", e),
            }
            if records.is_empty() {
                self.flush().await?;
            }
        }
        Ok(())
    }

    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        self.primary
            .write_all(&buf)
            .await
            .context("writing output failed")?;
        self.written += 1;

        if let Some(mirror) = &mut self.mirror {
            if let Err(e) = save_line(mirror, &buf).await {
                self.mirror_failures += 1;
                error!("error writing {}: {}", line, e);
            }
        }
        Ok(())
    }

    /// Flushes the primary writer; the mirror is already flushed per line
    pub async fn flush(&mut self) -> Result<()> {
        self.primary.flush().await.context("flushing output failed")
    }

    /// Lines written to the primary writer
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn mirror_failures(&self) -> usize {
        self.mirror_failures
    }

    pub fn into_inner(self) -> (P, Option<M>) {
        (self.primary, self.mirror)
    }
}

async fn save_line<M: AsyncWrite + Unpin>(mirror: &mut M, buf: &[u8]) -> io::Result<()> {
    mirror.write_all(buf).await?;
    mirror.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue<T: Send + 'static>(items: Vec<T>) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            tx.try_send(item).expect("queue sized for all items");
        }
        rx
    }

    #[test]
    fn test_render() {
        assert_eq!("example.com".to_string().render().unwrap(), "example.com");
        assert_eq!(
            Userinfo::with_password("alice", "secret").render().unwrap(),
            "alice:secret"
        );
        assert_eq!(Userinfo::new("bob").render().unwrap(), "bob");
        assert_eq!(
            QueryMap::parse("y=3&x=1&x=2").unwrap().render().unwrap(),
            r#"{"x":["1","2"],"y":["3"]}"#
        );
    }

    #[tokio::test]
    async fn test_drain_writes_primary_and_mirror() {
        let mut sink = OutputSink::new(Vec::<u8>::new(), Some(Vec::<u8>::new()));
        sink.drain(queue(vec!["a".to_string(), "b".to_string()]))
            .await
            .unwrap();

        assert_eq!(sink.written(), 2);
        let (primary, mirror) = sink.into_inner();
        assert_eq!(primary, b"a\nb\n");
        assert_eq!(mirror.unwrap(), b"a\nb\n");
    }

    #[tokio::test]
    async fn test_mirror_failure_does_not_stop_output() {
        let broken = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::Other, "disk full"))
            .write_error(io::Error::new(io::ErrorKind::Other, "disk full"))
            .build();
        let mut sink = OutputSink::new(Vec::<u8>::new(), Some(broken));

        sink.write_line("first").await.unwrap();
        sink.write_line("second").await.unwrap();

        assert_eq!(sink.written(), 2);
        assert_eq!(sink.mirror_failures(), 2);
        let (primary, _) = sink.into_inner();
        assert_eq!(primary, b"first\nsecond\n");
    }

    #[tokio::test]
    async fn test_buffered_mirror_failures_are_counted_per_line() {
        let broken = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::Other, "disk full"))
            .write_error(io::Error::new(io::ErrorKind::Other, "disk full"))
            .write_error(io::Error::new(io::ErrorKind::Other, "disk full"))
            .build();
        let mut sink = OutputSink::new(Vec::<u8>::new(), Some(BufWriter::new(broken)));

        for (n, line) in ["one", "two", "three"].into_iter().enumerate() {
            sink.write_line(line).await.unwrap();
            assert_eq!(sink.mirror_failures(), n + 1);
        }

        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 3);
        assert_eq!(sink.mirror_failures(), 3);
        let (primary, _) = sink.into_inner();
        assert_eq!(primary, b"one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal() {
        let broken = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();
        let mut sink: OutputSink<_, Vec<u8>> = OutputSink::new(broken, None);

        assert!(sink.write_line("lost").await.is_err());
        assert_eq!(sink.written(), 0);
    }

    #[tokio::test]
    async fn test_stdout_sink_creates_results_file() {
        let path = std::env::temp_dir().join(format!("urlbits-{}.txt", uuid::Uuid::new_v4()));
        let options = Options {
            save: true,
            output: path.clone(),
            ..Options::default()
        };

        let sink = StdoutSink::stdout(&options).await.unwrap();
        drop(sink);
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }
}
