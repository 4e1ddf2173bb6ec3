use tokio::sync::mpsc;
use tracing::{trace, warn};

/// A record dropped by a stage, reported on the side channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A line that is not a valid URI for the configured parse mode
    ParseFailed { input: String, reason: String },
    /// A parsed URI missing its scheme or host while validation is on
    Invalid { uri: String },
    /// A raw query string that could not be decoded
    QueryFailed { raw_query: String, reason: String },
}

/// Handle stages use to report dropped records
///
/// Reporting is a no-op unless verbose mode is on. Events go to the log and,
/// when someone subscribed, to an unbounded channel so that the data path
/// never waits on a slow reader.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    verbose: bool,
    subscriber: Option<mpsc::UnboundedSender<Diagnostic>>,
}

impl Diagnostics {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            subscriber: None,
        }
    }

    /// Creates a handle that also forwards every report to the returned receiver
    pub fn subscribed(verbose: bool) -> (Self, mpsc::UnboundedReceiver<Diagnostic>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                verbose,
                subscriber: Some(tx),
            },
            rx,
        )
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        if !self.verbose {
            trace!("Dropped record: {:?}", diagnostic);
            return;
        }

        match &diagnostic {
            Diagnostic::ParseFailed { input, reason } => {
                warn!("parsing error for {}: {}", input, reason)
            }
            Diagnostic::Invalid { uri } => warn!("{} not valid url", uri),
            Diagnostic::QueryFailed { raw_query, reason } => {
                warn!("param parsing error for {}: {}", raw_query, reason)
            }
        }

        if let Some(tx) = &self.subscriber {
            // a closed subscriber only means nobody is listening any more
            let _ = tx.send(diagnostic);
        }
    }
}
