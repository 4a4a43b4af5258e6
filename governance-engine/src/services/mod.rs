//! Governance services
//!
//! Each service owns one group of entities and runs its writes as single
//! store transactions.

pub mod catalog;
pub mod leadership;
pub mod membership;
pub mod organization;
pub mod profile;
pub mod resolution;

pub use catalog::CatalogService;
pub use leadership::LeadershipService;
pub use membership::MembershipService;
pub use organization::OrganizationService;
pub use profile::ProfileService;
pub use resolution::{AccessScope, ResolutionService, Subject};

use crate::error::{GovernanceError, GovernanceResult};

/// Trim a required name and check its length.
pub(crate) fn require_name(field: &str, value: &str, max_len: usize) -> GovernanceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GovernanceError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(GovernanceError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, mapping blank to `None`, and check its length.
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> GovernanceResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max_len => Err(GovernanceError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        ))),
        Some(text) => Ok(Some(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_name() {
        assert_eq!(require_name("Name", "  Ministry ", 255).unwrap(), "Ministry");
        assert!(require_name("Name", "   ", 255).is_err());
        assert!(require_name("Name", "abcdef", 5).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("Abbreviation", None, 5).unwrap(), None);
        assert_eq!(optional_text("Abbreviation", Some(" ".into()), 5).unwrap(), None);
        assert_eq!(
            optional_text("Abbreviation", Some("DJP".into()), 5).unwrap(),
            Some("DJP".to_string())
        );
        assert!(optional_text("Abbreviation", Some("TOOLONG".into()), 5).is_err());
    }
}
