//! 顶层报告结构体

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub vm_name: String,
    pub system: SystemInfo,
    pub services: BTreeMap<String, ServiceInfo>,
    pub socket: SocketInfo,
    pub web_access: WebAccess,
    pub logs: BTreeMap<String, u64>,
    pub checks: CheckCounts,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os_version: String,
    pub os_codename: String,
    pub kernel: String,
    pub python_version: String,
    pub python_major_minor: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
}

impl ServiceInfo {
    pub fn with_status(status: ServiceStatus) -> Self {
        Self { status, pid: None, uptime: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Fatal,
    NotFound,
    Error,
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Fatal => "fatal",
            ServiceStatus::NotFound => "not_found",
            ServiceStatus::Error => "error",
            ServiceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketInfo {
    pub exists: bool,
    pub owner: String,
    pub group: String,
    pub permissions: String,
    pub www_data_in_group: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAccess {
    pub http_code: String,
    pub status: WebStatus,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebStatus {
    Accessible,
    BadGateway,
    ServiceUnavailable,
    ConnectionFailed,
    Error,
}

impl fmt::Display for WebStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WebStatus::Accessible => "accessible",
            WebStatus::BadGateway => "bad_gateway",
            WebStatus::ServiceUnavailable => "service_unavailable",
            WebStatus::ConnectionFailed => "connection_failed",
            WebStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCounts {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Summary {
    Passed,
    Warning,
    Failed,
}

impl Summary {
    pub fn exit_code(self) -> i32 {
        match self {
            Summary::Passed | Summary::Warning => 0,
            Summary::Failed => 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Summary::Passed => "PASSED",
            Summary::Warning => "WARNING",
            Summary::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// `lokole-gunicorn` and `lokole_gunicorn` name the same program.
pub fn normalize_service_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

impl VerificationReport {
    /// Parse a report file and normalise service keys.
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        let mut report: VerificationReport = serde_json::from_str(s)?;
        report.services = std::mem::take(&mut report.services)
            .into_iter()
            .map(|(k, v)| (normalize_service_name(&k), v))
            .collect();
        Ok(report)
    }
}
