//! Path pattern matching module
//!
//! Patterns are lists of typed segments parsed once at startup, e.g.
//! `/point/{id}/charge` becomes `[Literal("point"), Param("id"), Literal("charge")]`.

/// One segment of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

/// Values captured by `{name}` segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl PathPattern {
    /// Parse a pattern such as `/point/{id}/histories`
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Match a request path, capturing parameters
    ///
    /// Literal segments compare exactly; parameters match any non-empty
    /// segment. Segment counts must agree, so trailing slashes do not match.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        if !path.starts_with('/') {
            return None;
        }

        let mut params = Vec::new();
        let mut parts = split_path(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.push((name.clone(), part.to_string()));
                }
                _ => return None,
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(PathParams(params))
    }
}

fn split_path(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_literal() {
        let pattern = PathPattern::parse("/healthz");
        assert!(pattern.matches("/healthz").is_some());
        assert!(pattern.matches("/healthz/").is_none());
        assert!(pattern.matches("/health").is_none());
        assert!(pattern.matches("healthz").is_none());
    }

    #[test]
    fn test_match_param() {
        let pattern = PathPattern::parse("/point/{id}/charge");
        let params = pattern.matches("/point/42/charge").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("other"), None);

        // Parameters capture raw text; typing happens in validation
        let params = pattern.matches("/point/abc/charge").unwrap();
        assert_eq!(params.get("id"), Some("abc"));
    }

    #[test]
    fn test_empty_segment_never_matches_param() {
        let pattern = PathPattern::parse("/point/{id}");
        assert!(pattern.matches("/point/").is_none());
        assert!(pattern.matches("/point//").is_none());
    }

    #[test]
    fn test_segment_count_must_agree() {
        let pattern = PathPattern::parse("/point/{id}");
        assert!(pattern.matches("/point").is_none());
        assert!(pattern.matches("/point/1/histories").is_none());
    }
}
