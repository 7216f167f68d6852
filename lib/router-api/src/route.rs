use serde::{Deserialize, Serialize};

/// Read/write access to the two regex fields of a route.
///
/// The version routing core only ever touches these fields, so any data-plane
/// route type can take part by implementing this trait.
pub trait RouteRegex {
    /// Regex the request path must match
    fn match_regex(&self) -> &str;

    fn set_match_regex(&mut self, regex: String);

    /// Pattern of the path rewrite, if the route rewrites paths at all
    fn rewrite_pattern(&self) -> Option<&str>;

    /// Replace the rewrite pattern. Ignored by routes without a path rewrite.
    fn set_rewrite_pattern(&mut self, pattern: String);
}

/// Data-plane route for one resource of a deployed API
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Name of this route (for reference)
    pub name: String,

    /// Match conditions for routing
    pub r#match: RouteMatch,

    /// What to do with a matched request
    pub action: RouteAction,
}

/// Route matching conditions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    /// Regex the full request path must match
    pub safe_regex: String,

    /// HTTP methods (GET, POST, etc)
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Forwarding action of a route
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAction {
    /// Upstream cluster receiving the traffic
    pub cluster: String,

    /// Optional regex based path rewrite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_rewrite: Option<RegexRewrite>,
}

/// Regex based path rewrite applied before forwarding
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexRewrite {
    pub pattern: String,
    pub substitution: String,
}

impl Route {
    /// Create a route that matches `path_regex` and forwards to `cluster` unchanged
    pub fn new(name: impl Into<String>, path_regex: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#match: RouteMatch {
                safe_regex: path_regex.into(),
                methods: Vec::new(),
            },
            action: RouteAction {
                cluster: cluster.into(),
                regex_rewrite: None,
            },
        }
    }

    /// Add a path rewrite to the route
    pub fn with_rewrite(mut self, pattern: impl Into<String>, substitution: impl Into<String>) -> Self {
        self.action.regex_rewrite = Some(RegexRewrite {
            pattern: pattern.into(),
            substitution: substitution.into(),
        });
        self
    }

    /// Restrict the route to the given HTTP methods
    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.r#match.methods = methods;
        self
    }
}

impl RouteRegex for Route {
    fn match_regex(&self) -> &str {
        &self.r#match.safe_regex
    }

    fn set_match_regex(&mut self, regex: String) {
        self.r#match.safe_regex = regex;
    }

    fn rewrite_pattern(&self) -> Option<&str> {
        self.action
            .regex_rewrite
            .as_ref()
            .map(|rewrite| rewrite.pattern.as_str())
    }

    fn set_rewrite_pattern(&mut self, pattern: String) {
        if let Some(rewrite) = self.action.regex_rewrite.as_mut() {
            rewrite.pattern = pattern;
        }
    }
}
