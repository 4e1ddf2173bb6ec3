use thiserror::Error;

/// Reasons a URI reference or query string is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("invalid control character in URL")]
    ControlCharacter,

    #[error("empty url")]
    Empty,

    #[error("missing protocol scheme")]
    MissingScheme,

    #[error("invalid URI for request")]
    NotRequestUri,

    #[error("first path segment in URL cannot contain colon")]
    ColonInFirstSegment,

    #[error("missing ']' in host")]
    MissingBracket,

    #[error("invalid port {0:?} after host")]
    InvalidPort(String),

    #[error("invalid userinfo")]
    InvalidUserinfo,

    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("invalid character {0:?} in host name")]
    InvalidHost(String),

    #[error("invalid semicolon separator in query")]
    SemicolonSeparator,
}

/// A failed parse together with the input that caused it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse {input:?}: {kind}")]
pub struct ParseError {
    pub input: String,
    #[source]
    pub kind: UriError,
}

impl ParseError {
    pub fn new(input: &str, kind: UriError) -> Self {
        Self {
            input: input.to_string(),
            kind,
        }
    }
}
