//! Pattern compilation.
//!
//! # Responsibilities
//! - Turn an endpoint template into a regex source plus method
//! - Validate the single-placeholder rule
//!
//! # Design Decisions
//! - A template without a placeholder gets a `$` end anchor, so `/users`
//!   never matches `/users/1`
//! - A placeholder becomes one capturing group; no anchor is appended
//! - Equality and hashing use only (source text, method), so the same route
//!   compiled twice lands in the same table slot
//! - Matching always covers the whole request path

use std::hash::{Hash, Hasher};

use axum::http::Method;
use regex::Regex;
use thiserror::Error;

use crate::mapping::EndpointSpec;

/// Why an endpoint template could not be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("template `{template}` has a placeholder but no varName/varExpression")]
    MissingVariable { template: String },

    #[error("placeholder `{token}` does not occur in template `{template}`")]
    PlaceholderNotFound { token: String, template: String },

    #[error("template `{template}` has more than one placeholder")]
    MultiplePlaceholders { template: String },

    #[error("invalid expression `{source_text}`: {error}")]
    InvalidRegex {
        source_text: String,
        #[source]
        error: regex::Error,
    },
}

/// A compiled `(regex, method)` routing key.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    method: Method,
    matcher: Regex,
}

impl CompiledPattern {
    /// Regex source text, as derived from the template.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns `Some(captured)` when method and full path match.
    ///
    /// `captured` is the placeholder value, if the template had one.
    pub fn match_path(&self, method: &Method, path: &str) -> Option<Option<String>> {
        if *method != self.method {
            return None;
        }
        let caps = self.matcher.captures(path)?;
        Some(caps.get(1).map(|m| m.as_str().to_string()))
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.method == other.method
    }
}

impl Eq for CompiledPattern {}

impl Hash for CompiledPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.method.hash(state);
    }
}

/// Derive the regex source for a template.
pub fn pattern_source(endpoint: &EndpointSpec) -> Result<String, PatternError> {
    let template = &endpoint.external_path;
    if !template.contains('{') {
        return Ok(format!("{template}$"));
    }

    let var = endpoint
        .variable
        .as_ref()
        .ok_or_else(|| PatternError::MissingVariable {
            template: template.clone(),
        })?;
    let token = var.token();
    match template.matches(&token).count() {
        0 => {
            return Err(PatternError::PlaceholderNotFound {
                token,
                template: template.clone(),
            })
        }
        1 => {}
        _ => {
            return Err(PatternError::MultiplePlaceholders {
                template: template.clone(),
            })
        }
    }
    if template.replacen(&token, "", 1).contains('{') {
        return Err(PatternError::MultiplePlaceholders {
            template: template.clone(),
        });
    }

    Ok(template.replacen(&token, &format!("({})", var.expression), 1))
}

/// Compile one endpoint into its routing key.
pub fn compile(endpoint: &EndpointSpec) -> Result<CompiledPattern, PatternError> {
    let source = pattern_source(endpoint)?;
    let matcher = Regex::new(&format!("^(?:{source})$")).map_err(|error| {
        PatternError::InvalidRegex {
            source_text: source.clone(),
            error,
        }
    })?;
    Ok(CompiledPattern {
        source,
        method: endpoint.method.clone(),
        matcher,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Backend, PathVariable};
    use std::collections::HashSet;

    fn endpoint(method: Method, path: &str, var: Option<(&str, &str)>) -> EndpointSpec {
        EndpointSpec {
            method,
            external_path: path.into(),
            internal_path: path.into(),
            variable: var.map(|(name, expression)| PathVariable {
                name: name.into(),
                expression: expression.into(),
            }),
            action_names: Vec::new(),
            filter_name: None,
            scope: None,
            backend: Backend::new("h", 1),
        }
    }

    #[test]
    fn test_literal_path_matches_exactly() {
        let p = compile(&endpoint(Method::GET, "/users", None)).unwrap();
        assert_eq!(p.source(), "/users$");
        assert_eq!(p.match_path(&Method::GET, "/users"), Some(None));
        assert_eq!(p.match_path(&Method::GET, "/users/1"), None);
        assert_eq!(p.match_path(&Method::GET, "/users2"), None);
        assert_eq!(p.match_path(&Method::GET, "/api/users"), None);
        assert_eq!(p.match_path(&Method::POST, "/users"), None);
    }

    #[test]
    fn test_placeholder_captures_expression() {
        let p = compile(&endpoint(Method::GET, "/users/{id}", Some(("id", "[0-9]+")))).unwrap();
        assert_eq!(p.source(), "/users/([0-9]+)");
        assert_eq!(p.match_path(&Method::GET, "/users/42"), Some(Some("42".into())));
        assert_eq!(p.match_path(&Method::GET, "/users/abc"), None);
        assert_eq!(p.match_path(&Method::GET, "/users/"), None);
    }

    #[test]
    fn test_expression_may_capture_trailing_segments() {
        let p = compile(&endpoint(Method::GET, "/files/{rest}", Some(("rest", ".+")))).unwrap();
        assert_eq!(
            p.match_path(&Method::GET, "/files/a/b/c.txt"),
            Some(Some("a/b/c.txt".into()))
        );
    }

    #[test]
    fn test_expression_with_quantifier_braces() {
        let p = compile(&endpoint(Method::GET, "/pin/{pin}", Some(("pin", "[0-9]{4}")))).unwrap();
        assert!(p.match_path(&Method::GET, "/pin/1234").is_some());
        assert!(p.match_path(&Method::GET, "/pin/123").is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = compile(&endpoint(Method::GET, "/users/{id}", Some(("id", "[0-9]+")))).unwrap();
        let b = compile(&endpoint(Method::GET, "/users/{id}", Some(("id", "[0-9]+")))).unwrap();
        let c = compile(&endpoint(Method::PUT, "/users/{id}", Some(("id", "[0-9]+")))).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_placeholder_errors() {
        let missing = compile(&endpoint(Method::GET, "/users/{id}", None)).unwrap_err();
        assert!(matches!(missing, PatternError::MissingVariable { .. }));

        let wrong_name =
            compile(&endpoint(Method::GET, "/users/{id}", Some(("uid", "[0-9]+")))).unwrap_err();
        assert!(matches!(wrong_name, PatternError::PlaceholderNotFound { .. }));

        let two = compile(&endpoint(
            Method::GET,
            "/users/{id}/posts/{post}",
            Some(("id", "[0-9]+")),
        ))
        .unwrap_err();
        assert!(matches!(two, PatternError::MultiplePlaceholders { .. }));
    }

    #[test]
    fn test_invalid_expression() {
        let err = compile(&endpoint(Method::GET, "/users/{id}", Some(("id", "[0-9")))).unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
    }
}
