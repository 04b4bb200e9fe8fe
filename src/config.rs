//! 可选的 TOML 配置文件；所有字段都有默认值，命令行参数优先

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::utils::{Result, VerifyError};

pub const DEFAULT_VM_NAME: &str = "iiab-lokole-test";
pub const DEFAULT_WARNING_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vm_name: String,
    /// supervisor program names; hyphens are normalised to underscores
    pub services: Vec<String>,
    pub socket_path: String,
    pub web_url: String,
    /// log source name -> path on the target
    pub logs: BTreeMap<String, String>,
    /// summary becomes WARNING only above this many warnings
    pub warning_threshold: u32,
    pub command_timeout_secs: u64,
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    pub api_base: String,
    /// `owner/name`
    pub repo: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let logs = [
            ("nginx_errors", "/var/log/nginx/error.log"),
            ("gunicorn_errors", "/home/lokole/state/lokole_gunicorn.stderr.log"),
            ("celery_errors", "/home/lokole/state/lokole_celery_worker.stderr.log"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            vm_name: DEFAULT_VM_NAME.to_string(),
            services: vec![
                "lokole_gunicorn".to_string(),
                "lokole_celery_beat".to_string(),
                "lokole_celery_worker".to_string(),
                "lokole_restarter".to_string(),
            ],
            socket_path: "/home/lokole/state/lokole_gunicorn.sock".to_string(),
            web_url: "http://localhost/lokole/".to_string(),
            logs,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            command_timeout_secs: 30,
            github: GitHubConfig::default(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            repo: None,
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vm_name.trim().is_empty() {
            return Err(VerifyError::Config("vm_name must not be empty".to_string()));
        }
        if self.services.iter().any(|s| s.trim().is_empty()) {
            return Err(VerifyError::Config("service names must not be empty".to_string()));
        }
        if self.command_timeout_secs == 0 {
            return Err(VerifyError::Config("command_timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let cfg = Config::load(None).expect("defaults load");
        assert_eq!(cfg.vm_name, DEFAULT_VM_NAME);
        assert_eq!(cfg.warning_threshold, 2);
        assert_eq!(cfg.services.len(), 4);
        assert_eq!(cfg.github.api_base, "https://api.github.com");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            f,
            "vm_name = \"iiab-noble\"\nwarning_threshold = 0\n\n[github]\nrepo = \"iiab/iiab\""
        )
        .expect("write");
        let cfg = Config::load(Some(f.path())).expect("config loads");
        assert_eq!(cfg.vm_name, "iiab-noble");
        assert_eq!(cfg.warning_threshold, 0);
        assert_eq!(cfg.github.repo.as_deref(), Some("iiab/iiab"));
        assert_eq!(cfg.socket_path, Config::default().socket_path);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(f, "vm_nmae = \"typo\"").expect("write");
        let err = Config::load(Some(f.path())).expect_err("typo must fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/iiab-verify.toml")))
            .expect_err("missing file must fail");
        assert!(matches!(err, VerifyError::Config(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = Config { command_timeout_secs: 0, ..Config::default() };
        assert!(cfg.validate().is_err());
    }
}
