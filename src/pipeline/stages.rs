use tokio::sync::mpsc;
use tracing::trace;

use super::{Diagnostic, Diagnostics, Pipeline};
use crate::uri::{self, ParsedUri};

impl Pipeline {
    /// Parser stage: turns each line into a [`ParsedUri`], dropping lines
    /// that do not parse under the configured [`uri::ParseMode`]
    pub fn parsed(&mut self, lines: mpsc::Receiver<String>) -> mpsc::Receiver<ParsedUri> {
        let mode = self.options.parse_mode;
        let diagnostics = self.diagnostics.clone();

        self.spawn_stage("parsed", lines, move |line| match uri::parse(&line, mode) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                diagnostics.report(Diagnostic::ParseFailed {
                    input: line,
                    reason: e.kind.to_string(),
                });
                None
            }
        })
    }

    /// Validator stage: keeps only URIs with both a scheme and a host
    ///
    /// Without validation enabled no stage is spawned and `uris` is returned
    /// as is.
    pub fn validated(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<ParsedUri> {
        if !self.options.validate {
            trace!("Validation disabled, passing parsed URIs through");
            return uris;
        }

        let diagnostics = self.diagnostics.clone();
        self.spawn_stage("validated", uris, move |uri| validate(uri, &diagnostics))
    }
}

/// Returns `uri` if it has both a scheme and a host, reporting it otherwise
pub fn validate(uri: ParsedUri, diagnostics: &Diagnostics) -> Option<ParsedUri> {
    if uri.has_scheme_and_host() {
        return Some(uri);
    }
    diagnostics.report(Diagnostic::Invalid {
        uri: uri.to_string(),
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    async fn feed<T: Send + 'static>(
        capacity: usize,
        items: Vec<T>,
    ) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(async move {
            for item in items {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
        rx
    }

    async fn drain<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }

    fn verbose() -> Options {
        Options {
            verbose: true,
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn test_parser_drops_and_reports_bad_lines() {
        let (mut pipeline, mut diagnostics) = Pipeline::with_diagnostics(&verbose());
        let lines = feed(
            4,
            vec![
                "http://example.com/a".to_string(),
                "://bad".to_string(),
                "/relative/ok".to_string(),
            ],
        )
        .await;

        let uris = drain(pipeline.parsed(lines)).await;
        assert_eq!(uris.len(), 2);
        assert_eq!(uris[0].host, "example.com");
        assert_eq!(uris[1].path, "/relative/ok");

        let summary = pipeline.finish().await.unwrap();
        assert_eq!(summary.stage("parsed").unwrap().received, 3);
        assert_eq!(summary.stage("parsed").unwrap().emitted, 2);

        assert_eq!(
            diagnostics.recv().await,
            Some(Diagnostic::ParseFailed {
                input: "://bad".to_string(),
                reason: "missing protocol scheme".to_string(),
            })
        );
        assert!(diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_parser_is_silent_without_verbose() {
        let (mut pipeline, mut diagnostics) = Pipeline::with_diagnostics(&Options::default());
        let lines = feed(4, vec!["://bad".to_string()]).await;

        assert!(drain(pipeline.parsed(lines)).await.is_empty());
        pipeline.finish().await.unwrap();
        assert!(diagnostics.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_validator_requires_scheme_and_host() {
        let options = Options {
            validate: true,
            ..verbose()
        };
        let (mut pipeline, mut diagnostics) = Pipeline::with_diagnostics(&options);
        let uris = ["http://example.com/", "mailto:user@host", "/no/host", "file:///etc/passwd"]
            .into_iter()
            .map(|s| uri::parse_request_uri(s).unwrap())
            .collect();

        let kept = drain(pipeline.validated(feed(4, uris).await)).await;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].host, "example.com");

        pipeline.finish().await.unwrap();
        assert_eq!(
            diagnostics.recv().await,
            Some(Diagnostic::Invalid {
                uri: "mailto:user@host".to_string()
            })
        );
        assert_eq!(
            diagnostics.recv().await,
            Some(Diagnostic::Invalid {
                uri: "/no/host".to_string()
            })
        );
        assert_eq!(
            diagnostics.recv().await,
            Some(Diagnostic::Invalid {
                uri: "file:///etc/passwd".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_validator_is_pass_through_when_disabled() {
        let mut pipeline = Pipeline::new(&Options::default());
        let uris = vec![uri::parse_request_uri("mailto:user@host").unwrap()];

        let kept = drain(pipeline.validated(feed(1, uris).await)).await;
        assert_eq!(kept.len(), 1);

        let summary = pipeline.finish().await.unwrap();
        assert!(summary.stage("validated").is_none());
    }
}
