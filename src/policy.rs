use url::form_urlencoded;

/// Query parameter carrying the originally requested path on a login redirect.
pub const RETURN_PATH_PARAM: &str = "redirectTo";

/// classify
///
/// Returns true if `path` equals one of `patterns` exactly, or starts with a pattern
/// followed by a `/` (prefix match anchored at a segment boundary).
///
/// No normalization is performed: trailing slashes, case and percent-encoding are
/// compared literally. A pattern of `/` therefore only matches `/` itself and paths
/// beginning with `//`.
pub fn classify<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref();
        path == pattern
            || path
                .strip_prefix(pattern)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// RouteSet
///
/// An ordered list of route patterns (exact paths or segment prefixes).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet(Vec<String>);

impl RouteSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    /// Parses a comma-separated list such as `"/login, /signup"`. Blank entries are dropped.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty()),
        )
    }

    pub fn matches(&self, path: &str) -> bool {
        classify(path, &self.0)
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// RedirectTarget
///
/// Where a rejected request is sent, optionally carrying the original path forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: String,
    pub return_to: Option<String>,
}

impl RedirectTarget {
    /// location
    ///
    /// Renders the value for the `Location` header. The return path is form-urlencoded
    /// into the `redirectTo` parameter, appended with `&` if the target already has a query,
    /// and placed ahead of any `#fragment`.
    pub fn location(&self) -> String {
        match &self.return_to {
            None => self.path.clone(),
            Some(original) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(RETURN_PATH_PARAM, original)
                    .finish();
                let (base, fragment) = match self.path.find('#') {
                    Some(at) => self.path.split_at(at),
                    None => (self.path.as_str(), ""),
                };
                let separator = if base.contains('?') { '&' } else { '?' };
                format!("{}{}{}{}", base, separator, query, fragment)
            }
        }
    }
}

/// Outcome of evaluating a request path against the route policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(RedirectTarget),
}

/// RoutePolicy
///
/// The three route lists plus the two fixed redirect destinations. Normally built once
/// from configuration and shared read-only for the lifetime of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Reachable by anyone. Membership never causes a redirect.
    pub public: RouteSet,
    /// Only for visitors without a session (login, signup, ...).
    pub auth_only: RouteSet,
    /// Requires a session.
    pub protected: RouteSet,
    /// Where signed-in visitors are sent when they hit an auth-only route.
    pub after_login: String,
    /// Where anonymous visitors are sent when they hit a protected route.
    pub after_logout: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            public: RouteSet::new(["/"]),
            auth_only: RouteSet::new(["/login", "/signup", "/forgot-password"]),
            protected: RouteSet::new(["/dashboard"]),
            after_login: "/dashboard".to_string(),
            after_logout: "/login".to_string(),
        }
    }
}

impl RoutePolicy {
    pub fn decide(&self, path: &str, is_authenticated: bool) -> Decision {
        decide(path, is_authenticated, self)
    }

    /// redirect_warnings
    ///
    /// Lists configurations that would bounce a visitor between redirects forever.
    /// Reported at startup; the policy is still applied as configured.
    pub fn redirect_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.auth_only.matches(&self.after_login) {
            warnings.push(format!(
                "after-login target {} is itself an auth-only route",
                self.after_login
            ));
        }
        if self.protected.matches(&self.after_logout) {
            warnings.push(format!(
                "after-logout target {} is itself a protected route",
                self.after_logout
            ));
        }
        warnings
    }
}

/// decide
///
/// First match wins:
/// 1. signed in and on an auth-only route: redirect to `after_login`;
/// 2. anonymous and on a protected route: redirect to `after_logout` with `redirectTo=<path>`;
/// 3. anything else passes through.
pub fn decide(path: &str, is_authenticated: bool, policy: &RoutePolicy) -> Decision {
    if is_authenticated && policy.auth_only.matches(path) {
        return Decision::Redirect(RedirectTarget {
            path: policy.after_login.clone(),
            return_to: None,
        });
    }

    if !is_authenticated && policy.protected.matches(path) {
        return Decision::Redirect(RedirectTarget {
            path: policy.after_logout.clone(),
            return_to: Some(path.to_string()),
        });
    }

    Decision::Allow
}

/// safe_return_path
///
/// Picks the destination after a successful sign-in. A client-supplied path is only
/// honoured when it is a local absolute path (not `//host` or containing `\`) and does
/// not point back into the auth-only routes; anything else yields `after_login`.
pub fn safe_return_path(candidate: Option<&str>, policy: &RoutePolicy) -> String {
    let Some(path) = candidate else {
        return policy.after_login.clone();
    };
    let bare = path.split(['?', '#']).next().unwrap_or(path);

    if path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !policy.auth_only.matches(bare)
    {
        path.to_string()
    } else {
        policy.after_login.clone()
    }
}
