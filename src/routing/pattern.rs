//! Route template compilation and matching.
//!
//! # Responsibilities
//! - Turn `/users/{id}/posts/{slug}` into `^/users/(?P<id>[^/]+)/posts/(?P<slug>[^/]+)$`
//! - Reject templates that reuse a parameter name
//! - Extract named captures from a concrete path
//!
//! # Design Decisions
//! - Anchored at both ends: a template never matches a prefix of a path
//! - Literal text is not escaped; `.` in a template matches any character

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::protocol::PathParams;
use crate::routing::table::RouteId;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// Errors raised while building or editing the route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route template `{template}`: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },
    #[error("parameter `{name}` appears more than once in `{template}`")]
    DuplicateParameter { template: String, name: String },
    #[error("no route with id {0}")]
    UnknownRoute(RouteId),
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled, immutable form of a route template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a template with `{name}` placeholders.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let name = &caps[1];
            if !seen.insert(name.to_string()) {
                return Err(RouteError::DuplicateParameter {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            if whole.start() > cursor {
                segments.push(Segment::Literal(template[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Param(name.to_string()));
            cursor = whole.end();
        }
        if cursor < template.len() {
            segments.push(Segment::Literal(template[cursor..].to_string()));
        }

        let body = PLACEHOLDER.replace_all(template, "(?P<${1}>[^/]+)");
        let regex = Regex::new(&format!("^{body}$")).map_err(|source| RouteError::InvalidPattern {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            segments,
            regex,
        })
    }

    /// Match a full request path, returning the named captures.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        Some(
            self.parameter_names()
                .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                .collect(),
        )
    }

    /// Recompile this template underneath `prefix`. A root template contributes
    /// nothing, so `/` mounted at `/about` becomes `/about`.
    pub fn with_prefix(&self, prefix: &str) -> Result<Self, RouteError> {
        let child = if self.template == "/" { "" } else { self.template.as_str() };
        Self::compile(&format!("{prefix}{child}"))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The compiled expression, for diagnostics.
    pub fn as_regex(&self) -> &str {
        self.regex.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_segments() {
        let pattern = RoutePattern::compile("/users/{id}/posts/{slug}").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("/users/".into()),
                Segment::Param("id".into()),
                Segment::Literal("/posts/".into()),
                Segment::Param("slug".into()),
            ]
        );
        assert_eq!(pattern.as_regex(), "^/users/(?P<id>[^/]+)/posts/(?P<slug>[^/]+)$");
    }

    #[test]
    fn test_substituted_values_round_trip() {
        let pattern = RoutePattern::compile("/users/{id}/posts/{slug}").unwrap();
        for (id, slug) in [("42", "hello-world"), ("alice", "x"), ("%20", "a.b.c")] {
            let path = format!("/users/{id}/posts/{slug}");
            let params = pattern.matches(&path).unwrap();
            assert_eq!(params.len(), 2);
            assert_eq!(params["id"], id);
            assert_eq!(params["slug"], slug);
        }
    }

    #[test]
    fn test_match_is_anchored() {
        let pattern = RoutePattern::compile("/users/{id}").unwrap();
        assert!(pattern.matches("/users/1").is_some());
        assert!(pattern.matches("/users/1/extra").is_none());
        assert!(pattern.matches("/api/users/1").is_none());
        assert!(pattern.matches("/users/").is_none());
    }

    #[test]
    fn test_parameter_does_not_cross_slash() {
        let pattern = RoutePattern::compile("/{name}").unwrap();
        assert!(pattern.matches("/a/b").is_none());
        assert_eq!(pattern.matches("/bob").unwrap()["name"], "bob");
    }

    #[test]
    fn test_static_template_has_no_params() {
        let pattern = RoutePattern::compile("/").unwrap();
        assert_eq!(pattern.matches("/"), Some(PathParams::new()));
        assert_eq!(pattern.parameter_names().count(), 0);
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = RoutePattern::compile("/{id}/{id}").unwrap_err();
        assert!(matches!(err, RouteError::DuplicateParameter { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_metacharacters_are_not_escaped() {
        // `.` is a regex wildcard here; this is documented behaviour.
        let pattern = RoutePattern::compile("/file.txt").unwrap();
        assert!(pattern.matches("/fileXtxt").is_some());
        assert!(RoutePattern::compile("/broken(").is_err());
    }

    #[test]
    fn test_with_prefix() {
        let root = RoutePattern::compile("/").unwrap();
        assert_eq!(root.with_prefix("/about").unwrap().template(), "/about");

        let named = RoutePattern::compile("/{name}/hello").unwrap();
        let mounted = named.with_prefix("/about").unwrap();
        assert_eq!(mounted.template(), "/about/{name}/hello");
        assert_eq!(mounted.matches("/about/ann/hello").unwrap()["name"], "ann");
    }
}
