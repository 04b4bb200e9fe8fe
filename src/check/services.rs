//! supervisor 服务状态收集
//! 来源：supervisorctl status <name>

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::check::report::{normalize_service_name, ServiceInfo, ServiceStatus};
use crate::remote::{CommandOutput, Executor};
use crate::utils::Result;

pub fn collect(exec: &dyn Executor, names: &[String]) -> BTreeMap<String, ServiceInfo> {
    let mut services = BTreeMap::new();
    for raw in names {
        let name = normalize_service_name(raw);
        // supervisorctl 对非 RUNNING 状态返回非零退出码，不能用 capture
        let out = exec.run(&format!("sudo supervisorctl status {} 2>&1", name));
        let info = parse_status(&name, out);
        tracing::debug!(service = %name, status = %info.status, "service checked");
        services.insert(name, info);
    }
    services
}

fn running_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"pid\s+(\d+),\s+uptime\s+(\S+)").expect("static regex"))
}

/// Map one `supervisorctl status` answer to a [`ServiceInfo`].
pub fn parse_status(name: &str, out: Result<CommandOutput>) -> ServiceInfo {
    let out = match out {
        Ok(o) => o,
        Err(_) => return ServiceInfo::with_status(ServiceStatus::Unknown),
    };
    let text = out.stdout.trim();
    if text.is_empty() {
        return ServiceInfo::with_status(ServiceStatus::Unknown);
    }

    let lower = text.to_lowercase();
    if lower.contains("no such process") || lower.contains("error (no such") {
        return ServiceInfo::with_status(ServiceStatus::NotFound);
    }

    let line = text
        .lines()
        .find(|l| l.split_whitespace().next().map(normalize_service_name).as_deref() == Some(name))
        .unwrap_or(text);
    let state = line.split_whitespace().nth(1).unwrap_or("").to_uppercase();

    match state.as_str() {
        "RUNNING" => {
            let (pid, uptime) = running_re()
                .captures(line)
                .map(|c| (Some(c[1].to_string()), Some(c[2].to_string())))
                .unwrap_or((None, None));
            ServiceInfo { status: ServiceStatus::Running, pid, uptime }
        }
        "STOPPED" | "EXITED" => ServiceInfo::with_status(ServiceStatus::Stopped),
        "FATAL" | "BACKOFF" => ServiceInfo::with_status(ServiceStatus::Fatal),
        "STARTING" | "STOPPING" => ServiceInfo::with_status(ServiceStatus::Unknown),
        _ => ServiceInfo::with_status(ServiceStatus::Error),
    }
}
