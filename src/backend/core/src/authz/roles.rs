//! Role extraction from the caller's role attribute.
//!
//! Upstream authentication hands roles over as a single delimiter-joined
//! string (`"viewer,editor"`). The extractor turns that into a [`RoleSet`]
//! and recognises the privileged role that bypasses tenant and policy checks.

use super::models::{Role, RoleSet};

/// The role exempt from tenant scoping and policy lookup.
pub const PRIVILEGED_ROLE: &str = "admin";

/// Default separator between role names.
pub const DEFAULT_ROLE_DELIMITER: &str = ",";

/// Parses role attributes and identifies the privileged role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleExtractor {
    delimiter: String,
    privileged_role: String,
}

impl RoleExtractor {
    pub fn new(delimiter: impl Into<String>, privileged_role: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            privileged_role: privileged_role.into(),
        }
    }

    /// Split a raw attribute into roles.
    ///
    /// Names are trimmed, empty entries dropped and duplicates collapsed.
    /// Returns `None` if nothing usable remains.
    pub fn parse(&self, raw: &str) -> Option<RoleSet> {
        let roles: RoleSet = raw
            .split(self.delimiter.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Role::from)
            .collect();

        if roles.is_empty() {
            None
        } else {
            Some(roles)
        }
    }

    /// Extract roles from an optional attribute. Absent attribute yields `None`.
    pub fn extract(&self, raw: Option<&str>) -> Option<RoleSet> {
        raw.and_then(|value| self.parse(value))
    }

    pub fn is_privileged(&self, roles: &RoleSet) -> bool {
        roles.contains(&self.privileged_role)
    }

    pub fn privileged_role(&self) -> &str {
        &self.privileged_role
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }
}

impl Default for RoleExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE_DELIMITER, PRIVILEGED_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &RoleSet) -> Vec<&str> {
        set.iter().map(Role::as_str).collect()
    }

    #[test]
    fn test_parse_comma_joined() {
        let extractor = RoleExtractor::default();
        let roles = extractor.parse("viewer,editor").unwrap();
        assert_eq!(names(&roles), vec!["viewer", "editor"]);
    }

    #[test]
    fn test_parse_trims_and_drops_empty() {
        let extractor = RoleExtractor::default();
        let roles = extractor.parse(" viewer , ,editor,").unwrap();
        assert_eq!(names(&roles), vec!["viewer", "editor"]);
    }

    #[test]
    fn test_parse_empty_is_none() {
        let extractor = RoleExtractor::default();
        assert!(extractor.parse("").is_none());
        assert!(extractor.parse(" , ").is_none());
        assert!(extractor.extract(None).is_none());
    }

    #[test]
    fn test_privileged_detection() {
        let extractor = RoleExtractor::default();
        assert!(extractor.is_privileged(&extractor.parse("viewer,admin").unwrap()));
        assert!(!extractor.is_privileged(&extractor.parse("administrator").unwrap()));
        assert!(!extractor.is_privileged(&extractor.parse("Admin").unwrap()));
    }

    #[test]
    fn test_custom_delimiter() {
        let extractor = RoleExtractor::new(" ", "root");
        let roles = extractor.parse("ops root").unwrap();
        assert_eq!(names(&roles), vec!["ops", "root"]);
        assert!(extractor.is_privileged(&roles));
    }
}
