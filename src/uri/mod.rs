//! Request-URI parsing and the query-string model built on top of it.
//!
//! A parsed URI is either hierarchical (`[scheme:][//[userinfo@]host][/]path`)
//! or opaque (`scheme:opaque`). Both forms may carry a raw query, and
//! references parsed with [`ParseMode::Reference`] may also carry a fragment.

pub mod error;
pub mod escape;
pub mod parser;
pub mod query;


use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use self::escape::{escape, Component};

pub use error::{ParseError, UriError};
pub use parser::{parse, parse_reference, parse_request_uri};
pub use query::QueryMap;

/// How input lines are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Absolute or path-absolute request URIs only; `#` is not special
    #[default]
    Request,
    /// Any URI reference, relative forms and fragments included
    Reference,
}

/// Username and optional password from the authority of a hierarchical URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Userinfo {
    username: String,
    password: Option<String>,
}

impl Userinfo {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn password_set(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Display for Userinfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape(self.username.as_bytes(), Component::UserPassword))?;
        if let Some(password) = &self.password {
            write!(f, ":{}", escape(password.as_bytes(), Component::UserPassword))?;
        }
        Ok(())
    }
}

/// A URI reference decomposed into its components
///
/// Produced once by the parser stage and never mutated afterwards. Serializes
/// as the full-record view, omitting every empty component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedUri {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub opaque: String,             // encoded opaque data
    #[serde(
        skip_serializing_if = "no_userinfo",
        serialize_with = "serialize_userinfo"
    )]
    pub user: Option<Userinfo>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,               // host or host:port
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_path: String,           // set only when not the canonical encoding of path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_query: String,          // encoded query, without '?'
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fragment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub raw_fragment: String,       // set only when not the canonical encoding of fragment
    #[serde(skip)]
    pub omit_host: bool,            // scheme given but no `//` authority
}

impl ParsedUri {
    /// Whether this is the `scheme:opaque` form
    pub fn is_opaque(&self) -> bool {
        !self.opaque.is_empty()
    }

    pub fn has_scheme_and_host(&self) -> bool {
        !self.scheme.is_empty() && !self.host.is_empty()
    }

    /// Parses the raw query into a [`QueryMap`]
    pub fn query_map(&self) -> Result<QueryMap, UriError> {
        QueryMap::parse(&self.raw_query)
    }
}

impl fmt::Display for ParsedUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        if self.is_opaque() {
            f.write_str(&self.opaque)?;
        } else {
            let has_authority = !self.host.is_empty() || self.user.is_some();
            if has_authority || (!self.scheme.is_empty() && !self.omit_host) {
                if has_authority || !self.path.is_empty() {
                    f.write_str("//")?;
                }
                if let Some(user) = &self.user {
                    write!(f, "{user}@")?;
                }
                f.write_str(&escape(self.host.as_bytes(), Component::Host))?;
            }
            if self.raw_path.is_empty() {
                f.write_str(&escape(self.path.as_bytes(), Component::Path))?;
            } else {
                f.write_str(&self.raw_path)?;
            }
        }
        if !self.raw_query.is_empty() {
            write!(f, "?{}", self.raw_query)?;
        }
        if !self.fragment.is_empty() {
            f.write_str("#")?;
            if self.raw_fragment.is_empty() {
                f.write_str(&escape(self.fragment.as_bytes(), Component::Fragment))?;
            } else {
                f.write_str(&self.raw_fragment)?;
            }
        }
        Ok(())
    }
}

fn no_userinfo(user: &Option<Userinfo>) -> bool {
    user.as_ref().map_or(true, |u| u.to_string().is_empty())
}

fn serialize_userinfo<S: Serializer>(user: &Option<Userinfo>, serializer: S) -> Result<S::Ok, S::Error> {
    match user {
        Some(user) => serializer.collect_str(user),
        None => serializer.serialize_none(),
    }
}
