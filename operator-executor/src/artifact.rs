//! Text of the two credential files handed to `osc`.

use std::path::Path;

use operator_core::Endpoint;

/// Written as the password; authentication rides entirely on the cookie.
pub const PASSWORD_PLACEHOLDER: &str = "invalid";

/// User written to the config when the request names none.
pub const ANONYMOUS_USER: &str = "anonymous";

const LWP_HEADER: &str = "#LWP-Cookies-2.0";

/// Renders the client config pointing `osc` at `endpoint` and `cookie_jar`.
#[must_use]
pub fn render_config(endpoint: &Endpoint, cookie_jar: &Path, user: &str) -> String {
    [
        "[general]".to_owned(),
        format!("apiurl = {endpoint}"),
        format!("cookiejar = {}", cookie_jar.display()),
        "staging.color = 0".to_owned(),
        format!("[{endpoint}]"),
        format!("user = {user}"),
        format!("pass = {PASSWORD_PLACEHOLDER}"),
        String::new(),
    ]
    .join("\n")
}

/// Renders a one-cookie jar in libwww-perl format.
///
/// The cookie is scoped to `/`, secure, host-only and has no expiry.
#[must_use]
pub fn render_cookie_jar(name: &str, value: &str) -> String {
    let attributes = [
        format!("{name}={}", lwp_value(value)),
        format!("path={}", lwp_value("/")),
        format!("domain={}", lwp_value("")),
        "path_spec".to_owned(),
        "domain_dot".to_owned(),
        "secure".to_owned(),
        format!("version={}", lwp_value("0")),
    ];
    format!("{LWP_HEADER}\nSet-Cookie3: {}\n", attributes.join("; "))
}

/// Bare if the value is one or more word characters, else quoted with `"`
/// and `\` escaped.
fn lwp_value(value: &str) -> String {
    let is_word = !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '_');
    if is_word {
        return value.to_owned();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_names_endpoint_jar_and_user() {
        let endpoint = Endpoint::new("https://api.opensuse.org");
        let text = render_config(&endpoint, Path::new("/tmp/jar-1"), "alice");
        assert_eq!(
            text,
            "[general]\n\
             apiurl = https://api.opensuse.org\n\
             cookiejar = /tmp/jar-1\n\
             staging.color = 0\n\
             [https://api.opensuse.org]\n\
             user = alice\n\
             pass = invalid\n"
        );
    }

    #[test]
    fn cookie_jar_line_has_lwp_attributes() {
        let text = render_cookie_jar("openSUSE_session", "abc123");
        assert_eq!(
            text,
            "#LWP-Cookies-2.0\n\
             Set-Cookie3: openSUSE_session=abc123; path=\"/\"; domain=\"\"; path_spec; domain_dot; secure; version=0\n"
        );
    }

    #[test]
    fn cookie_value_with_punctuation_is_quoted_and_escaped() {
        assert_eq!(lwp_value("a-b"), "\"a-b\"");
        assert_eq!(lwp_value("x\"y\\z"), "\"x\\\"y\\\\z\"");
        assert_eq!(lwp_value(""), "\"\"");
        assert_eq!(lwp_value("Token_42"), "Token_42");
    }
}
