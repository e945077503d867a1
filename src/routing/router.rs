//! Path prefix to service lookup.
//!
//! # Responsibilities
//! - Map the first path segment to a service name
//! - Return the remaining path (query string included) for the upstream
//! - Report a missing or unknown prefix explicitly
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Prefixes are matched case-insensitively

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Missing service prefix in path")]
    MissingPrefix,

    #[error("Unknown service: {0}")]
    UnknownService(String),
}

/// A resolved route: which service, and what path to send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub service: String,
    pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceRouter {
    routes: HashMap<String, String>,
}

impl ServiceRouter {
    pub fn new(routes: &BTreeMap<String, String>) -> Self {
        let routes = routes
            .iter()
            .map(|(prefix, service)| {
                (prefix.trim_matches('/').to_ascii_lowercase(), service.clone())
            })
            .collect();
        Self { routes }
    }

    /// Resolve `/prefix/rest?query` to the service behind `prefix` and `/rest?query`.
    pub fn resolve(&self, path_and_query: &str) -> Result<ResolvedRoute, RouteError> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let (prefix, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if prefix.is_empty() {
            return Err(RouteError::MissingPrefix);
        }

        let service = self
            .routes
            .get(&prefix.to_ascii_lowercase())
            .ok_or_else(|| RouteError::UnknownService(prefix.to_string()))?;

        let mut sub_path = format!("/{}", rest);
        if let Some(query) = query {
            sub_path.push('?');
            sub_path.push_str(query);
        }

        Ok(ResolvedRoute {
            service: service.clone(),
            path: sub_path,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
