//! Route handlers: turn a matched route plus request data into commands.
//!
//! Every handler is a pure function of the path arguments, query string,
//! `Accept` header and (for POST) the JSON body. Values flow into argv
//! tokens unchanged, so a project called `; rm -rf /` is just an odd
//! project name to `osc`.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::command::{Command, CommandBatch};
use crate::error::CoreError;
use crate::route::{GetRoute, Method, PostRoute, QueryParams, RequestPath, Route};

/// Message used for submit requests when the caller gives none.
pub const DEFAULT_SUBMIT_MESSAGE: &str = "created via operator";

/// Formats `osc` accepts through the `Accept` header.
const NEGOTIABLE_FORMATS: [&str; 2] = ["json", "yaml"];

/// Everything a handler may read from one request.
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub path: &'a RequestPath,
    pub query: &'a QueryParams,
    pub accept: Option<&'a str>,
    pub body: &'a PostBody,
}

/// Resolved work for a request.
#[derive(Debug)]
pub enum Dispatch {
    /// GET routes run exactly one command.
    Single(Command),
    /// POST routes may fan out.
    Batch(CommandBatch),
}

impl Dispatch {
    /// Views either variant as a batch.
    #[must_use]
    pub fn into_batch(self) -> CommandBatch {
        match self {
            Self::Single(command) => CommandBatch::single(command),
            Self::Batch(batch) => batch,
        }
    }
}

/// Maps a request onto the command(s) it stands for.
///
/// # Errors
/// Returns [`CoreError::RouteNotFound`] when the path matches no route or
/// lacks required positionals, and [`CoreError::MalformedBody`] when a POST
/// handler cannot read its body.
pub fn resolve(method: Method, request: DispatchRequest<'_>) -> Result<Dispatch, CoreError> {
    let args = request.path.args();
    match Route::matching(method, request.path)? {
        Route::Get(route) => route.command(args, request.query, request.accept).map(Dispatch::Single),
        Route::Post(route) => route.commands(args, request.query, request.body).map(Dispatch::Batch),
    }
}

/// Picks the output format flag value, if any.
///
/// A `json` or `yaml` subtype in `Accept` wins, then a non-empty `format`
/// query value.
#[must_use]
pub fn negotiate_format<'a>(accept: Option<&'a str>, query: &'a QueryParams) -> Option<&'a str> {
    accept
        .and_then(|value| value.split('/').nth(1))
        .filter(|subtype| NEGOTIABLE_FORMATS.iter().any(|format| format == subtype))
        .or_else(|| query.first("format"))
}

fn push_format(command: &mut Command, accept: Option<&str>, query: &QueryParams) {
    if let Some(format) = negotiate_format(accept, query) {
        command.args(["--format", format]);
    }
}

fn positional<'a>(args: &'a [String], index: usize, route: &str) -> Result<&'a str, CoreError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| CoreError::route_not_found(route))
}

fn origin_command(project: &str, subcommand: &str) -> Command {
    Command::osc(["origin", "-p", project, subcommand])
}

impl GetRoute {
    /// Builds the command for this route.
    ///
    /// # Errors
    /// Returns [`CoreError::RouteNotFound`] if a required positional is missing.
    pub fn command(
        self,
        args: &[String],
        query: &QueryParams,
        accept: Option<&str>,
    ) -> Result<Command, CoreError> {
        let key = self.key();
        let command = match self {
            Self::OriginConfig => {
                let mut cmd = origin_command(positional(args, 0, key)?, "config");
                cmd.flag_if(query.contains("origins-only"), "--origins-only");
                cmd
            }
            Self::OriginHistory => {
                let mut cmd = origin_command(positional(args, 0, key)?, "history");
                push_format(&mut cmd, accept, query);
                cmd.args(args.get(1));
                cmd
            }
            Self::OriginList => {
                let mut cmd = origin_command(positional(args, 0, key)?, "list");
                cmd.flag_if(query.contains("force-refresh"), "--force-refresh");
                push_format(&mut cmd, accept, query);
                cmd
            }
            Self::OriginPackage => {
                let mut cmd = origin_command(positional(args, 0, key)?, "package");
                cmd.flag_if(query.contains("debug"), "--debug");
                cmd.args(args.get(1));
                cmd
            }
            Self::OriginPotentials => {
                let mut cmd = origin_command(positional(args, 0, key)?, "potentials");
                push_format(&mut cmd, accept, query);
                cmd.args(args.get(1));
                cmd
            }
            Self::OriginProjects => {
                let mut cmd = Command::osc(["origin", "projects"]);
                push_format(&mut cmd, accept, query);
                cmd
            }
            Self::OriginReport => {
                let mut cmd = origin_command(positional(args, 0, key)?, "report");
                cmd.flag_if(query.contains("force-refresh"), "--force-refresh");
                cmd
            }
            Self::PackageDiff => package_diff(args)?,
        };
        Ok(command)
    }
}

/// `source_project source_package target_project [target_package]
/// [source_revision [target_revision]]`
fn package_diff(args: &[String]) -> Result<Command, CoreError> {
    let key = GetRoute::PackageDiff.key();
    let mut cmd = Command::osc([
        "rdiff",
        positional(args, 0, key)?,
        positional(args, 1, key)?,
        positional(args, 2, key)?,
    ]);
    cmd.args(args.get(3));
    if args.len() >= 5 {
        // Only the source revision given still yields `rev:`.
        let target_revision = args.get(5).map_or("", String::as_str);
        cmd.args(["--revision".to_owned(), format!("{}:{target_revision}", args[4])]);
    }
    Ok(cmd)
}

impl PostRoute {
    /// Builds the command batch for this route.
    ///
    /// # Errors
    /// Returns [`CoreError::RouteNotFound`] if a required positional is missing
    /// and [`CoreError::MalformedBody`] if the body lacks required fields.
    pub fn commands(
        self,
        args: &[String],
        query: &QueryParams,
        body: &PostBody,
    ) -> Result<CommandBatch, CoreError> {
        match self {
            Self::RequestSubmit => request_submit(args, query).map(CommandBatch::single),
            Self::StagingSelect => staging_select(body),
        }
    }
}

fn request_submit(args: &[String], query: &QueryParams) -> Result<Command, CoreError> {
    let key = PostRoute::RequestSubmit.key();
    let mut cmd = Command::osc([
        "sr",
        positional(args, 0, key)?,
        positional(args, 1, key)?,
        positional(args, 2, key)?,
    ]);
    cmd.args(["-m", query.first("message").unwrap_or(DEFAULT_SUBMIT_MESSAGE)]);
    cmd.arg("--yes");
    Ok(cmd)
}

/// Body of `POST /staging/select`.
#[derive(Debug, Deserialize)]
struct StagingSelection {
    project: String,
    /// Staging name to request ids, in document order.
    selection: IndexMap<String, Vec<RequestRef>>,
    #[serde(default, rename = "move")]
    move_requests: Value,
}

/// Request identifiers arrive as strings or bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestRef {
    Number(u64),
    Text(String),
}

impl From<RequestRef> for String {
    fn from(request: RequestRef) -> Self {
        match request {
            RequestRef::Number(n) => n.to_string(),
            RequestRef::Text(s) => s,
        }
    }
}

fn staging_select(body: &PostBody) -> Result<CommandBatch, CoreError> {
    let selection = StagingSelection::deserialize(&body.0)
        .map_err(|e| CoreError::malformed(format!("staging selection: {e}")))?;
    let project = selection.project;
    let move_requests = is_truthy(&selection.move_requests);

    Ok(CommandBatch::lazy(selection.selection.into_iter().map(
        move |(staging, requests)| {
            let mut cmd = Command::osc(["staging", "-p", project.as_str(), "select"]);
            cmd.flag_if(move_requests, "--move");
            cmd.arg(staging);
            cmd.args(requests.into_iter().map(String::from));
            cmd
        },
    )))
}

/// JSON truthiness: `null`, `false`, zero and empty containers are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Parsed JSON body of a POST request. An empty body reads as `{}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostBody(Value);

impl PostBody {
    /// Parses raw request bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::MalformedBody`] for invalid UTF-8/JSON or a
    /// top-level value that is not an object.
    pub fn parse(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Ok(Self::empty());
        }
        let value: Value = serde_json::from_slice(bytes).map_err(|e| CoreError::malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(CoreError::malformed("expected a JSON object"));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// The acting user named in the body, if it is a string.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.0.get("user").and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str, query: &[(&str, &str)], accept: Option<&str>) -> Result<Vec<String>, CoreError> {
        let path = RequestPath::parse(path);
        let query: QueryParams = query.iter().copied().collect();
        let body = PostBody::empty();
        let request = DispatchRequest { path: &path, query: &query, accept, body: &body };
        match resolve(Method::Get, request)? {
            Dispatch::Single(cmd) => Ok(cmd.argv().to_vec()),
            Dispatch::Batch(_) => panic!("GET must resolve to a single command"),
        }
    }

    fn post(path: &str, query: &[(&str, &str)], body: &str) -> Result<Vec<Vec<String>>, CoreError> {
        let path = RequestPath::parse(path);
        let query: QueryParams = query.iter().copied().collect();
        let body = PostBody::parse(body.as_bytes())?;
        let request = DispatchRequest { path: &path, query: &query, accept: None, body: &body };
        Ok(resolve(Method::Post, request)?
            .into_batch()
            .map(|cmd| cmd.argv().to_vec())
            .collect())
    }

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn origin_history_places_format_before_package() {
        let cmd = get("/origin/history/myproject/mypackage", &[("format", "yaml")], None);
        assert_eq!(
            cmd,
            Ok(argv(&["osc", "origin", "-p", "myproject", "history", "--format", "yaml", "mypackage"]))
        );
    }

    #[test]
    fn accept_header_beats_format_query() {
        let cmd = get("/origin/list/P", &[("format", "yaml"), ("force-refresh", "1")], Some("application/json"));
        assert_eq!(
            cmd,
            Ok(argv(&["osc", "origin", "-p", "P", "list", "--force-refresh", "--format", "json"]))
        );
    }

    #[test]
    fn unsupported_accept_subtype_falls_back_to_query() {
        let query = QueryParams::from_pairs(vec![("format".to_owned(), "yaml".to_owned())]);
        assert_eq!(negotiate_format(Some("text/html"), &query), Some("yaml"));
        assert_eq!(negotiate_format(Some("*/*"), &QueryParams::default()), None);
        assert_eq!(negotiate_format(Some("garbage"), &QueryParams::default()), None);
        assert_eq!(negotiate_format(None, &QueryParams::default()), None);
    }

    #[test]
    fn origin_config_origins_only_flag() {
        assert_eq!(
            get("/origin/config/P", &[("origins-only", "1")], None),
            Ok(argv(&["osc", "origin", "-p", "P", "config", "--origins-only"]))
        );
        assert_eq!(
            get("/origin/config/P", &[("origins-only", "")], None),
            Ok(argv(&["osc", "origin", "-p", "P", "config"]))
        );
        assert_eq!(
            get("/origin/config/P/ignored", &[], Some("application/json")),
            Ok(argv(&["osc", "origin", "-p", "P", "config"]))
        );
    }

    #[test]
    fn origin_package_debug_then_package() {
        assert_eq!(
            get("/origin/package/P/pkg", &[("debug", "1")], None),
            Ok(argv(&["osc", "origin", "-p", "P", "package", "--debug", "pkg"]))
        );
    }

    #[test]
    fn origin_potentials_and_report() {
        assert_eq!(
            get("/origin/potentials/P/pkg", &[], Some("application/yaml")),
            Ok(argv(&["osc", "origin", "-p", "P", "potentials", "--format", "yaml", "pkg"]))
        );
        assert_eq!(
            get("/origin/report/P", &[("force-refresh", "true")], Some("application/json")),
            Ok(argv(&["osc", "origin", "-p", "P", "report", "--force-refresh"]))
        );
        assert_eq!(
            get("/origin/report/P", &[("force-refresh", "")], None),
            Ok(argv(&["osc", "origin", "-p", "P", "report"]))
        );
    }

    #[test]
    fn origin_projects_has_no_project_positional() {
        assert_eq!(
            get("/origin/projects/anything", &[("format", "json")], None),
            Ok(argv(&["osc", "origin", "projects", "--format", "json"]))
        );
    }

    #[test]
    fn package_diff_with_source_revision_only_leaves_trailing_colon() {
        assert_eq!(
            get("/package/diff/SP/spkg/TP/tpkg/rev1", &[], None),
            Ok(argv(&["osc", "rdiff", "SP", "spkg", "TP", "tpkg", "--revision", "rev1:"]))
        );
        assert_eq!(
            get("/package/diff/SP/spkg/TP/tpkg/3/7", &[], None),
            Ok(argv(&["osc", "rdiff", "SP", "spkg", "TP", "tpkg", "--revision", "3:7"]))
        );
        assert_eq!(
            get("/package/diff/SP/spkg/TP", &[], None),
            Ok(argv(&["osc", "rdiff", "SP", "spkg", "TP"]))
        );
    }

    #[test]
    fn package_diff_missing_positionals_is_not_found() {
        assert!(matches!(
            get("/package/diff/SP/spkg", &[], None),
            Err(CoreError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn unknown_get_route_is_not_found() {
        assert!(matches!(get("/origin/nuke/P", &[], None), Err(CoreError::RouteNotFound { .. })));
        assert!(matches!(get("/origin/history", &[], None), Err(CoreError::RouteNotFound { .. })));
    }

    #[test]
    fn request_submit_uses_message_or_default() {
        assert_eq!(
            post("/request/submit/SP/pkg/TP", &[("message", "please")], ""),
            Ok(vec![argv(&["osc", "sr", "SP", "pkg", "TP", "-m", "please", "--yes"])])
        );
        assert_eq!(
            post("/request/submit/SP/pkg/TP", &[("message", "")], ""),
            Ok(vec![argv(&["osc", "sr", "SP", "pkg", "TP", "-m", DEFAULT_SUBMIT_MESSAGE, "--yes"])])
        );
    }

    #[test]
    fn request_submit_missing_positionals_is_not_found() {
        assert!(matches!(
            post("/request/submit/SP", &[], ""),
            Err(CoreError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn staging_select_single_entry_with_move() {
        let body = r#"{"project":"P","selection":{"A":["req1","req2"]},"move":true}"#;
        assert_eq!(
            post("/staging/select", &[], body),
            Ok(vec![argv(&["osc", "staging", "-p", "P", "select", "--move", "A", "req1", "req2"])])
        );
    }

    #[test]
    fn staging_select_keeps_document_order_and_numeric_ids() {
        let body = r#"{"project":"P","selection":{"C":[3],"A":["1"],"B":[2, "9"]},"move":0}"#;
        assert_eq!(
            post("/staging/select", &[], body),
            Ok(vec![
                argv(&["osc", "staging", "-p", "P", "select", "C", "3"]),
                argv(&["osc", "staging", "-p", "P", "select", "A", "1"]),
                argv(&["osc", "staging", "-p", "P", "select", "B", "2", "9"]),
            ])
        );
    }

    #[test]
    fn staging_select_missing_fields_is_malformed() {
        assert!(matches!(post("/staging/select", &[], ""), Err(CoreError::MalformedBody { .. })));
        assert!(matches!(
            post("/staging/select", &[], r#"{"project":"P","selection":["A"]}"#),
            Err(CoreError::MalformedBody { .. })
        ));
    }

    #[test]
    fn post_body_rejects_non_objects() {
        assert!(PostBody::parse(b"[1,2]").is_err());
        assert!(PostBody::parse(b"{not json").is_err());
        assert_eq!(PostBody::parse(b""), Ok(PostBody::empty()));
    }

    #[test]
    fn post_body_user_must_be_string() {
        let body = match PostBody::parse(br#"{"user":"alice"}"#) {
            Ok(b) => b,
            Err(e) => panic!("unexpected error: {e}"),
        };
        assert_eq!(body.user(), Some("alice"));
        let numeric = PostBody::parse(br#"{"user":7}"#).map(|b| b.user().map(str::to_owned));
        assert_eq!(numeric, Ok(None));
    }

    #[test]
    fn truthiness_follows_json_semantics() {
        assert!(is_truthy(&serde_json::json!(true)));
        assert!(is_truthy(&serde_json::json!(1)));
        assert!(is_truthy(&serde_json::json!("yes")));
        assert!(!is_truthy(&serde_json::json!(0)));
        assert!(!is_truthy(&serde_json::json!("")));
        assert!(!is_truthy(&serde_json::json!([])));
        assert!(!is_truthy(&Value::Null));
    }

    proptest::proptest! {
        #[test]
        fn proptest_path_segments_stay_single_tokens(
            project in "[^/?#]{1,24}",
            package in "[^/?#]{1,24}",
        ) {
            let path = format!("/origin/history/{project}/{package}");
            let argv = get(&path, &[], None);
            let argv = match argv {
                Ok(a) => a,
                Err(e) => return Err(proptest::test_runner::TestCaseError::fail(e.to_string())),
            };
            proptest::prop_assert_eq!(argv.len(), 6);
            proptest::prop_assert_eq!(&argv[3], &project);
            proptest::prop_assert_eq!(&argv[5], &package);
        }
    }
}
