//! Validation of the anonymous-access allow-list.
//!
//! Every allow-listed path must resolve to a real API route, and the
//! [`DEFAULT_ALLOWED_PATHS`] are always kept on the list. Route resolution is
//! memoised per exact path string in a bounded LRU cache.

use std::sync::Arc;

use moka::{policy::EvictionPolicy, sync::Cache};
use thiserror::Error;

/// Paths that must stay reachable without credentials for basic operation.
pub const DEFAULT_ALLOWED_PATHS: &[&str] = &["/api/", "/api/v2/", "/api/v2/ping/"];

/// Number of distinct paths whose resolution result is remembered.
pub const RESOLUTION_CACHE_CAPACITY: u64 = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowListError {
  #[error("Invalid paths: {}", .0.join(", "))]
  InvalidPaths(Vec<String>),
}

// ─── Route resolution ────────────────────────────────────────────────────────

/// Answers whether a request path would be routed to a handler.
pub trait RouteResolver: Send + Sync {
  fn resolves(&self, path: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  /// `{name}`: exactly one non-empty segment.
  Param,
  /// `{*name}`: one or more trailing segments.
  CatchAll,
}

/// Route patterns in axum syntax (`/hosts/{id}/facts/`), matched segment by
/// segment. Trailing slashes are significant.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
  patterns: Vec<Vec<Segment>>,
}

impl RouteTable {
  pub fn new<I, P>(patterns: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
  {
    let patterns = patterns
      .into_iter()
      .map(|p| {
        p.as_ref()
          .split('/')
          .map(|seg| {
            match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
              Some(name) if name.starts_with('*') => Segment::CatchAll,
              Some(_) => Segment::Param,
              None => Segment::Literal(seg.to_owned()),
            }
          })
          .collect()
      })
      .collect();
    Self { patterns }
  }

  fn matches(pattern: &[Segment], path: &[&str]) -> bool {
    match (pattern.split_first(), path.split_first()) {
      (None, None) => true,
      (Some((Segment::CatchAll, _)), Some((first, _))) => !first.is_empty(),
      (Some((Segment::Param, rest)), Some((seg, tail))) => {
        !seg.is_empty() && Self::matches(rest, tail)
      }
      (Some((Segment::Literal(lit), rest)), Some((seg, tail))) => {
        lit == seg && Self::matches(rest, tail)
      }
      _ => false,
    }
  }
}

impl RouteResolver for RouteTable {
  fn resolves(&self, path: &str) -> bool {
    if !path.starts_with('/') {
      return false;
    }
    let segments: Vec<&str> = path.split('/').collect();
    self.patterns.iter().any(|p| Self::matches(p, &segments))
  }
}

// ─── Validator ───────────────────────────────────────────────────────────────

/// Checks allow-lists against a [`RouteResolver`], caching each answer.
#[derive(Clone)]
pub struct AllowListValidator {
  resolver: Arc<dyn RouteResolver>,
  cache:    Cache<String, bool>,
}

impl AllowListValidator {
  pub fn new(resolver: impl RouteResolver + 'static) -> Self {
    Self {
      resolver: Arc::new(resolver),
      cache:    Cache::builder()
        .max_capacity(RESOLUTION_CACHE_CAPACITY)
        .eviction_policy(EvictionPolicy::lru())
        .build(),
    }
  }

  /// Whether `path` resolves to a route. Memoised.
  pub fn is_valid_path(&self, path: &str) -> bool {
    self
      .cache
      .get_with_by_ref(path, || self.resolver.resolves(path))
  }

  /// Validate an allow-list.
  ///
  /// Fails with every unresolvable path. Otherwise returns the list with any
  /// missing default paths prepended, in their default order, ahead of the
  /// caller's paths.
  pub fn validate(&self, paths: Vec<String>) -> Result<Vec<String>, AllowListError> {
    let invalid: Vec<String> = paths
      .iter()
      .filter(|p| !self.is_valid_path(p))
      .cloned()
      .collect();
    if !invalid.is_empty() {
      return Err(AllowListError::InvalidPaths(invalid));
    }

    let mut completed: Vec<String> = DEFAULT_ALLOWED_PATHS
      .iter()
      .filter(|d| !paths.iter().any(|p| p == *d))
      .map(|d| (*d).to_owned())
      .collect();
    completed.extend(paths);
    Ok(completed)
  }
}
