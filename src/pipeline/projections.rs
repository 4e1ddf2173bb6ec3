use tokio::sync::mpsc;
use tracing::error;

use super::{Diagnostic, Pipeline};
use crate::uri::{ParsedUri, QueryMap, UriError, Userinfo};

/// Host component, possibly empty (validation upstream removes empty hosts)
pub fn project_host(uri: ParsedUri) -> String {
    uri.host
}

/// Path component, except for the uninformative `""` and `"/"`
pub fn project_path(uri: ParsedUri) -> Option<String> {
    match uri.path.as_str() {
        "" | "/" => None,
        _ => Some(uri.path),
    }
}

pub fn project_user(uri: ParsedUri) -> Option<Userinfo> {
    uri.user
}

/// Query map of `uri`, or `None` when the query holds no parameters
pub fn project_query_map(uri: &ParsedUri) -> Result<Option<QueryMap>, UriError> {
    let map = uri.query_map()?;
    Ok(if map.is_empty() { None } else { Some(map) })
}

/// Full record of `uri` as indented JSON, empty components omitted
pub fn project_record(uri: &ParsedUri) -> serde_json::Result<String> {
    serde_json::to_string_pretty(uri)
}

impl Pipeline {
    pub fn hosts(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<String> {
        self.spawn_stage("hosts", uris, |uri| Some(project_host(uri)))
    }

    pub fn paths(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<String> {
        self.spawn_stage("paths", uris, project_path)
    }

    /// Emits credentials only for URIs that carry a userinfo part
    pub fn users(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<Userinfo> {
        self.spawn_stage("users", uris, project_user)
    }

    /// Emits one non-empty [`QueryMap`] per URI; malformed queries are
    /// dropped and reported like parse failures
    pub fn query_maps(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<QueryMap> {
        let diagnostics = self.diagnostics.clone();
        self.spawn_stage("query_maps", uris, move |uri| {
            project_query_map(&uri).unwrap_or_else(|e| {
                diagnostics.report(Diagnostic::QueryFailed {
                    raw_query: uri.raw_query,
                    reason: e.to_string(),
                });
                None
            })
        })
    }

    /// Every key of every map; a key seen on several lines is emitted each time
    pub fn keys(&mut self, maps: mpsc::Receiver<QueryMap>) -> mpsc::Receiver<String> {
        self.spawn_stage("keys", maps, QueryMap::into_keys)
    }

    /// Every value of every key, repeated keys flattened in input order
    pub fn values(&mut self, maps: mpsc::Receiver<QueryMap>) -> mpsc::Receiver<String> {
        self.spawn_stage("values", maps, QueryMap::into_values)
    }

    pub fn records(&mut self, uris: mpsc::Receiver<ParsedUri>) -> mpsc::Receiver<String> {
        self.spawn_stage("records", uris, |uri| match project_record(&uri) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("unable to marshal {}: {}", uri, e);
                None
            }
        })
    }
}
