use thiserror::Error;

/// Errors the catalog reports back to the user.
///
/// Stale references (unknown show, season or episode) are not errors; those
/// operations leave the snapshot untouched instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Input could not be turned into a YouTube video id
    #[error("Please enter a valid YouTube URL or ID (got {0:?})")]
    UnresolvableIdentifier(String),

    /// Video was not added through admin mode
    #[error("Only videos uploaded through Admin can be deleted ({0})")]
    DeleteForbidden(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    /// A mutating command was issued while admin mode is off
    #[error("Admin mode is required to {0}; pass --admin or set `admin: true`")]
    AdminModeRequired(&'static str),
}

impl CatalogError {
    /// Whether the user can fix this by changing what they typed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CatalogError::UnresolvableIdentifier(_) | CatalogError::DeleteForbidden(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = CatalogError::DeleteForbidden("abc123".to_string());
        assert!(err.to_string().contains("abc123"));

        let err = CatalogError::UnresolvableIdentifier("short".to_string());
        assert!(err.to_string().contains("\"short\""));
    }

    #[test]
    fn test_validation_classification() {
        assert!(CatalogError::UnresolvableIdentifier(String::new()).is_validation());
        assert!(CatalogError::DeleteForbidden("x".into()).is_validation());
        assert!(!CatalogError::VideoNotFound("x".into()).is_validation());
        assert!(!CatalogError::AdminModeRequired("add videos").is_validation());
    }
}
