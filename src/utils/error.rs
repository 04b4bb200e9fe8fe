use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote command error: {0}")]
    Remote(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("System error: {0}")]
    System(String),

    #[error("Interrupted")]
    Interrupted,
}

impl VerifyError {
    /// Process exit code for this error.
    ///
    /// | Code | Meaning                 |
    /// |------|-------------------------|
    /// | 1    | Failure or Ctrl-C       |
    /// | 2    | Configuration error     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for VerifyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(format!("JSON: {}", e))
    }
}

impl From<serde_yaml::Error> for VerifyError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse(format!("YAML: {}", e))
    }
}

impl From<toml::de::Error> for VerifyError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_two() {
        let err = VerifyError::Config("missing token".to_owned());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Configuration error: missing token");
    }

    #[test]
    fn interrupted_is_a_plain_failure() {
        assert_eq!(VerifyError::Interrupted.exit_code(), 1);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(VerifyError::Remote("boom".into()).exit_code(), 1);
        assert_eq!(VerifyError::GitHub("401".into()).exit_code(), 1);
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken")
            .expect_err("should fail parsing");
        let err: VerifyError = json_err.into();
        assert!(matches!(err, VerifyError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error: JSON:"));
    }
}
