use thiserror::Error;

/// The kind of string being parsed when a parse failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseField {
    Version,
    Release,
    Branch,
}

impl std::fmt::Display for ParseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseField::Version => write!(f, "version"),
            ParseField::Release => write!(f, "release"),
            ParseField::Branch => write!(f, "branch"),
        }
    }
}

/// Unified error type for releng operations
#[derive(Error, Debug)]
pub enum RelengError {
    #[error("Invalid {field} string: '{input}'")]
    Parse { field: ParseField, input: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing promotion branches: {}", .branches.join(", "))]
    MissingBranch { branches: Vec<String> },

    #[error("Branch {src} has not been merged into {dest} ({commits} unmerged commits)")]
    PromotionViolation {
        src: String,
        dest: String,
        commits: usize,
    },

    #[error("Config file error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in releng
pub type Result<T> = std::result::Result<T, RelengError>;

impl RelengError {
    /// Create a parse error naming the offending input
    pub fn parse(field: ParseField, input: impl Into<String>) -> Self {
        RelengError::Parse {
            field,
            input: input.into(),
        }
    }

    /// Create a validation error with context
    pub fn validation(msg: impl Into<String>) -> Self {
        RelengError::Validation(msg.into())
    }

    /// Create a configuration error for a missing companion value
    pub fn configuration(msg: impl Into<String>) -> Self {
        RelengError::Configuration(msg.into())
    }

    /// Create a config file error with context
    pub fn config(msg: impl Into<String>) -> Self {
        RelengError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_field_and_input() {
        let err = RelengError::parse(ParseField::Release, "0.x");
        assert_eq!(err.to_string(), "Invalid release string: '0.x'");
    }

    #[test]
    fn test_missing_branch_lists_all() {
        let err = RelengError::MissingBranch {
            branches: vec!["3.1-dev".to_string(), "3.3-dev".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing promotion branches: 3.1-dev, 3.3-dev"
        );
    }

    #[test]
    fn test_promotion_violation_names_both_branches() {
        let err = RelengError::PromotionViolation {
            src: "origin/2.5-dev".to_string(),
            dest: "origin/2.6-dev".to_string(),
            commits: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("origin/2.5-dev"));
        assert!(msg.contains("origin/2.6-dev"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RelengError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (RelengError::validation("x"), "Validation error"),
            (RelengError::configuration("x"), "Configuration error"),
            (RelengError::config("x"), "Config file error"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
