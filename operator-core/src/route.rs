//! Request path parsing and the closed route table.

use std::fmt;

use crate::error::CoreError;

/// HTTP methods that carry dispatchable routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A URL path split into `/`-separated segments.
///
/// Segments are kept exactly as received; they become argv tokens and are
/// never handed to a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
}

impl RequestPath {
    /// Splits a path after removing its leading slashes.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim_start_matches('/');
        Self { segments: trimmed.split('/').map(str::to_owned).collect() }
    }

    /// The first two segments joined with `/`, e.g. `origin/history`.
    #[must_use]
    pub fn route_key(&self) -> String {
        self.segments
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `true` for `/` (and any run of bare slashes).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.route_key().is_empty()
    }

    /// Number of segments, counting empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: splitting yields at least one (possibly empty) segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments after the route key; these are the handler's positionals.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.segments.get(2..).unwrap_or(&[])
    }
}

/// Read-only routes, each mapping to one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GetRoute {
    OriginConfig,
    OriginHistory,
    OriginList,
    OriginPackage,
    OriginPotentials,
    OriginProjects,
    OriginReport,
    PackageDiff,
}

impl GetRoute {
    /// Every GET route, in allow-list order.
    pub const ALL: [Self; 8] = [
        Self::OriginConfig,
        Self::OriginHistory,
        Self::OriginList,
        Self::OriginPackage,
        Self::OriginPotentials,
        Self::OriginProjects,
        Self::OriginReport,
        Self::PackageDiff,
    ];

    /// Paths shorter than this never reach a handler.
    pub const MIN_SEGMENTS: usize = 3;

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::OriginConfig => "origin/config",
            Self::OriginHistory => "origin/history",
            Self::OriginList => "origin/list",
            Self::OriginPackage => "origin/package",
            Self::OriginPotentials => "origin/potentials",
            Self::OriginProjects => "origin/projects",
            Self::OriginReport => "origin/report",
            Self::PackageDiff => "package/diff",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.key() == key)
    }

    /// Looks up the handler for a GET path.
    ///
    /// # Errors
    /// Returns [`CoreError::RouteNotFound`] for short paths and keys outside
    /// the allow-list.
    pub fn matching(path: &RequestPath) -> Result<Self, CoreError> {
        let key = path.route_key();
        if path.len() < Self::MIN_SEGMENTS {
            return Err(CoreError::route_not_found(key));
        }
        Self::from_key(&key).ok_or_else(|| CoreError::route_not_found(key))
    }
}

impl fmt::Display for GetRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Mutating routes, each of which may fan out into several commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostRoute {
    RequestSubmit,
    StagingSelect,
}

impl PostRoute {
    pub const ALL: [Self; 2] = [Self::RequestSubmit, Self::StagingSelect];

    pub const MIN_SEGMENTS: usize = 2;

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::RequestSubmit => "request/submit",
            Self::StagingSelect => "staging/select",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.key() == key)
    }

    /// Looks up the handler for a POST path.
    ///
    /// # Errors
    /// Returns [`CoreError::RouteNotFound`] for short paths and keys outside
    /// the allow-list.
    pub fn matching(path: &RequestPath) -> Result<Self, CoreError> {
        let key = path.route_key();
        if path.len() < Self::MIN_SEGMENTS {
            return Err(CoreError::route_not_found(key));
        }
        Self::from_key(&key).ok_or_else(|| CoreError::route_not_found(key))
    }
}

impl fmt::Display for PostRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A matched route for either method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Get(GetRoute),
    Post(PostRoute),
}

impl Route {
    /// Matches `path` against the table for `method`.
    ///
    /// # Errors
    /// Returns [`CoreError::RouteNotFound`] when nothing matches.
    pub fn matching(method: Method, path: &RequestPath) -> Result<Self, CoreError> {
        match method {
            Method::Get => GetRoute::matching(path).map(Self::Get),
            Method::Post => PostRoute::matching(path).map(Self::Post),
        }
    }
}

/// Decoded query string, keeping repeated keys in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Pairs with a blank value are dropped, so `?debug` and `?debug=` set nothing.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }

    /// `true` if the key carries at least one non-empty value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.first(key).is_some()
    }

    /// First value for `key`.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let pairs = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v): &(String, String)| !v.is_empty())
            .collect();
        Self { pairs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_splits_route_key_and_args() {
        let path = RequestPath::parse("/origin/history/openSUSE:Factory/gcc");
        assert_eq!(path.route_key(), "origin/history");
        assert_eq!(path.args(), ["openSUSE:Factory", "gcc"]);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn root_path_is_detected() {
        assert!(RequestPath::parse("/").is_root());
        assert!(RequestPath::parse("").is_root());
        assert!(!RequestPath::parse("/origin").is_root());
    }

    #[test]
    fn get_route_requires_three_segments() {
        let short = RequestPath::parse("/origin/history");
        assert!(matches!(GetRoute::matching(&short), Err(CoreError::RouteNotFound { .. })));

        let ok = RequestPath::parse("/origin/history/P");
        assert_eq!(GetRoute::matching(&ok), Ok(GetRoute::OriginHistory));
    }

    #[test]
    fn post_route_requires_two_segments() {
        let one = RequestPath::parse("/staging");
        assert!(PostRoute::matching(&one).is_err());

        let two = RequestPath::parse("/staging/select");
        assert_eq!(PostRoute::matching(&two), Ok(PostRoute::StagingSelect));
    }

    #[test]
    fn unknown_key_and_wrong_method_do_not_match() {
        let path = RequestPath::parse("/origin/delete/P");
        assert!(Route::matching(Method::Get, &path).is_err());

        let post_only = RequestPath::parse("/request/submit/a/b/c");
        assert!(Route::matching(Method::Get, &post_only).is_err());
        assert_eq!(
            Route::matching(Method::Post, &post_only),
            Ok(Route::Post(PostRoute::RequestSubmit))
        );
    }

    #[test]
    fn route_keys_round_trip_through_table() {
        for route in GetRoute::ALL {
            assert_eq!(GetRoute::from_key(route.key()), Some(route));
        }
        for route in PostRoute::ALL {
            assert_eq!(PostRoute::from_key(route.key()), Some(route));
        }
    }

    #[test]
    fn query_params_drop_blank_values() {
        let query: QueryParams = [("force-refresh", ""), ("format", ""), ("format", "yaml")]
            .into_iter()
            .collect();
        assert!(!query.contains("force-refresh"));
        assert_eq!(query.first("force-refresh"), None);
        assert_eq!(query.first("format"), Some("yaml"));
        assert!(!query.contains("debug"));

        let query = QueryParams::from_pairs(vec![("debug".into(), "1".into())]);
        assert!(query.contains("debug"));
    }
}
