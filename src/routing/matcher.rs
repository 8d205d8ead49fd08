//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries: `/api` matches `/api` and
//!   `/api/x` but not `/apix`
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing `/` is dropped
    /// except for the root prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Specificity used to order candidate routes; longer wins.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }

    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api"));
        assert!(matcher.matches("/api/v1"));
        assert!(!matcher.matches("/apix"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/API/v1"));
    }

    #[test]
    fn test_trailing_slash_and_root() {
        let matcher = PathPrefixMatcher::new("/users/");
        assert_eq!(matcher.prefix(), "/users");
        assert!(matcher.matches("/users/42"));

        let root = PathPrefixMatcher::new("/");
        assert_eq!(root.prefix(), "/");
        assert!(root.matches("/anything"));
    }
}
