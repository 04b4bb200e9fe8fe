//! Markdown 渲染：PR / issue 评论正文
//!
//! Pure function of the report. The only time value in the output is the
//! report's own `timestamp`, so rendering the same report twice gives the
//! same bytes.

use crate::check::report::{ServiceStatus, Summary, VerificationReport, WebStatus};
use crate::check::system::{classify_python, PythonSupport};
use crate::check::tally::Outcome;

pub fn render(report: &VerificationReport) -> String {
    let mut out: Vec<String> = Vec::new();

    render_header(report, &mut out);
    render_system(report, &mut out);
    render_services(report, &mut out);
    render_socket(report, &mut out);
    render_web(report, &mut out);
    render_logs(report, &mut out);
    render_checks(report, &mut out);
    render_troubleshooting(report, &mut out);

    out.push("---".to_string());
    out.push("_Generated by iiab-verify_".to_string());

    let mut md = out.join("\n");
    md.push('\n');
    md
}

/// Table cells must not contain a bare `|`.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

// ── 各段落 ──────────────────────────────────────────────────────────────────

fn render_header(r: &VerificationReport, out: &mut Vec<String>) {
    let c = &r.checks;
    out.push("## 🧪 IIAB Lokole Verification Report".to_string());
    out.push(String::new());
    out.push(format!(
        "{} **Result: {}** ({} passed, {} warnings, {} failed of {} checks)",
        summary_icon(r.summary),
        r.summary,
        c.passed,
        c.warnings,
        c.failed,
        c.total
    ));
    out.push(String::new());
    out.push(format!("- **VM:** `{}`", r.vm_name));
    out.push(format!("- **Timestamp:** {}", r.timestamp));
    out.push(String::new());
}

fn render_system(r: &VerificationReport, out: &mut Vec<String>) {
    let s = &r.system;
    out.push("### 🖥️ System Information".to_string());
    out.push(String::new());
    out.push("| Property | Value |".to_string());
    out.push("|---|---|".to_string());
    out.push(format!("| OS Version | {} |", cell(&s.os_version)));
    out.push(format!("| Codename | {} |", cell(&s.os_codename)));
    out.push(format!("| Kernel | {} |", cell(&s.kernel)));
    out.push(format!("| Python | {} ({}) |", cell(&s.python_version), python_label(&s.python_major_minor)));
    out.push(String::new());
}

fn render_services(r: &VerificationReport, out: &mut Vec<String>) {
    out.push("### ⚙️ Services".to_string());
    out.push(String::new());
    if r.services.is_empty() {
        out.push("_No services checked._".to_string());
        out.push(String::new());
        return;
    }
    out.push("| Service | Status | PID | Uptime |".to_string());
    out.push("|---|---|---|---|".to_string());
    for (name, svc) in &r.services {
        out.push(format!(
            "| {} | {} {} | {} | {} |",
            cell(name),
            service_icon(svc.status),
            svc.status,
            cell(svc.pid.as_deref().unwrap_or("-")),
            cell(svc.uptime.as_deref().unwrap_or("-")),
        ));
    }
    out.push(String::new());
}

fn render_socket(r: &VerificationReport, out: &mut Vec<String>) {
    let s = &r.socket;
    out.push("### 🔌 Socket".to_string());
    out.push(String::new());
    out.push("| Property | Value |".to_string());
    out.push("|---|---|".to_string());
    out.push(format!("| Exists | {} |", yes_no(s.exists, Outcome::Fail)));
    out.push(format!("| Owner | {} |", cell(&s.owner)));
    out.push(format!("| Group | {} |", cell(&s.group)));
    out.push(format!("| Permissions | {} |", cell(&s.permissions)));
    out.push(format!("| www-data in group | {} |", yes_no(s.www_data_in_group, Outcome::Warning)));
    out.push(String::new());
}

fn render_web(r: &VerificationReport, out: &mut Vec<String>) {
    let w = &r.web_access;
    let icon = (if w.status == WebStatus::Accessible { Outcome::Pass } else { Outcome::Fail }).icon();
    out.push("### 🌐 Web Access".to_string());
    out.push(String::new());
    out.push("| Property | Value |".to_string());
    out.push("|---|---|".to_string());
    out.push(format!("| HTTP Code | {} |", cell(&w.http_code)));
    out.push(format!("| Status | {} {} |", icon, w.status));
    out.push(format!("| Response Time | {} ms |", w.response_time_ms));
    out.push(String::new());
}

fn render_logs(r: &VerificationReport, out: &mut Vec<String>) {
    out.push("### 📜 Logs".to_string());
    out.push(String::new());
    if r.logs.is_empty() {
        out.push("_No log sources checked._".to_string());
        out.push(String::new());
        return;
    }
    out.push("| Source | Error Lines |".to_string());
    out.push("|---|---|".to_string());
    for (name, count) in &r.logs {
        let icon = (if *count == 0 { Outcome::Pass } else { Outcome::Warning }).icon();
        out.push(format!("| {} | {} {} |", cell(name), icon, count));
    }
    out.push(String::new());
}

fn render_checks(r: &VerificationReport, out: &mut Vec<String>) {
    let c = &r.checks;
    out.push("### 📊 Checks".to_string());
    out.push(String::new());
    out.push("| Total | Passed | Warnings | Failed |".to_string());
    out.push("|---|---|---|---|".to_string());
    out.push(format!("| {} | {} | {} | {} |", c.total, c.passed, c.warnings, c.failed));
    out.push(String::new());
}

/// Only emitted when at least one known failure pattern is present.
fn render_troubleshooting(r: &VerificationReport, out: &mut Vec<String>) {
    let socket_perms = r.socket.exists && !r.socket.www_data_in_group;
    let not_running: Vec<&str> = r
        .services
        .iter()
        .filter(|(_, s)| s.status != ServiceStatus::Running)
        .map(|(n, _)| n.as_str())
        .collect();
    let http_bad = r.web_access.http_code != "200";

    if !socket_perms && not_running.is_empty() && !http_bad {
        return;
    }

    out.push("### 🔧 Troubleshooting".to_string());
    out.push(String::new());

    if socket_perms {
        out.push("#### Socket permissions".to_string());
        out.push(String::new());
        out.push(format!(
            "www-data is not a member of group `{}`, so nginx cannot open the gunicorn socket.",
            r.socket.group
        ));
        out.push(String::new());
        out.push("```bash".to_string());
        out.push(format!("sudo usermod -aG {} www-data", r.socket.group));
        out.push("sudo systemctl restart nginx".to_string());
        out.push("```".to_string());
        out.push(String::new());
    }

    if !not_running.is_empty() {
        let listed: Vec<String> = not_running.iter().map(|n| format!("`{}`", n)).collect();
        out.push("#### Services not running".to_string());
        out.push(String::new());
        out.push(format!("Not running: {}.", listed.join(", ")));
        out.push(String::new());
        out.push("```bash".to_string());
        out.push("sudo supervisorctl status".to_string());
        for n in &not_running {
            out.push(format!("sudo supervisorctl restart {}", n));
        }
        out.push("```".to_string());
        out.push(String::new());
    }

    if http_bad {
        let code = &r.web_access.http_code;
        out.push(format!("#### HTTP {}", code));
        out.push(String::new());
        out.push(http_hint(code));
        out.push(String::new());
        out.push("```bash".to_string());
        out.push("sudo systemctl status nginx".to_string());
        out.push("sudo tail -n 50 /var/log/nginx/error.log".to_string());
        out.push("```".to_string());
        out.push(String::new());
    }
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn summary_icon(s: Summary) -> &'static str {
    match s {
        Summary::Passed => Outcome::Pass.icon(),
        Summary::Warning => Outcome::Warning.icon(),
        Summary::Failed => Outcome::Fail.icon(),
    }
}

fn service_icon(s: ServiceStatus) -> &'static str {
    match s {
        ServiceStatus::Running => Outcome::Pass.icon(),
        ServiceStatus::Unknown => Outcome::Warning.icon(),
        _ => Outcome::Fail.icon(),
    }
}

fn python_label(major_minor: &str) -> String {
    match classify_python(major_minor) {
        PythonSupport::Supported => format!("{} supported", Outcome::Pass.icon()),
        PythonSupport::OlderSupported => format!("{} older, supported", Outcome::Warning.icon()),
        PythonSupport::Unsupported => format!("{} unsupported", Outcome::Fail.icon()),
        PythonSupport::Unknown => format!("{} unknown", Outcome::Warning.icon()),
    }
}

/// `✅ yes`, or `no` with the icon matching how bad a "no" is.
fn yes_no(v: bool, when_false: Outcome) -> String {
    if v {
        format!("{} yes", Outcome::Pass.icon())
    } else {
        format!("{} no", when_false.icon())
    }
}

fn http_hint(code: &str) -> String {
    match code {
        "502" => "nginx answered but could not reach gunicorn. Check the socket and `lokole_gunicorn`.".to_string(),
        "503" => "The application is unavailable; it may still be starting.".to_string(),
        "000" => "No HTTP response at all. Check that nginx is running.".to_string(),
        other => format!("Unexpected HTTP code {}. Check the nginx site configuration for /lokole.", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::report::*;
    use std::collections::BTreeMap;

    fn minimal() -> VerificationReport {
        VerificationReport {
            timestamp: "2025-06-01T12:00:00Z".into(),
            vm_name: "vm".into(),
            system: SystemInfo {
                os_version: "24.04".into(),
                os_codename: "noble".into(),
                kernel: "6.8.0".into(),
                python_version: "3.12.3".into(),
                python_major_minor: "3.12".into(),
            },
            services: BTreeMap::new(),
            socket: SocketInfo {
                exists: true,
                owner: "lokole".into(),
                group: "www-data".into(),
                permissions: "770".into(),
                www_data_in_group: true,
            },
            web_access: WebAccess {
                http_code: "200".into(),
                status: WebStatus::Accessible,
                response_time_ms: 12,
            },
            logs: BTreeMap::new(),
            checks: CheckCounts { total: 3, passed: 3, failed: 0, warnings: 0 },
            summary: Summary::Passed,
        }
    }

    #[test]
    fn pipes_in_values_do_not_split_cells() {
        let mut r = minimal();
        r.socket.owner = "lok|ole".into();
        r.socket.group = "a|b".into();
        r.services.insert(
            "odd|name".into(),
            ServiceInfo { status: ServiceStatus::Running, pid: Some("1".into()), uptime: Some("0:01|x".into()) },
        );
        let md = render(&r);
        assert!(md.contains("| Owner | lok\\|ole |"));
        assert!(md.contains("| Group | a\\|b |"));
        assert!(md.contains("| odd\\|name | ✅ running | 1 | 0:01\\|x |"));
    }

    #[test]
    fn healthy_report_has_no_troubleshooting() {
        let md = render(&minimal());
        assert!(md.starts_with("## 🧪 IIAB Lokole Verification Report\n"));
        assert!(md.contains("✅ **Result: PASSED** (3 passed, 0 warnings, 0 failed of 3 checks)"));
        assert!(md.contains("_No services checked._"));
        assert!(!md.contains("Troubleshooting"));
        assert!(md.ends_with("_Generated by iiab-verify_\n"));
    }

    #[test]
    fn socket_permission_problem_adds_usermod_hint() {
        let mut r = minimal();
        r.socket.group = "lokole".into();
        r.socket.www_data_in_group = false;
        let md = render(&r);
        assert!(md.contains("### 🔧 Troubleshooting"));
        assert!(md.contains("sudo usermod -aG lokole www-data"));
        assert!(md.contains("| www-data in group | ⚠️ no |"));
    }

    #[test]
    fn missing_socket_alone_has_no_permission_hint() {
        let mut r = minimal();
        r.socket.exists = false;
        r.socket.www_data_in_group = false;
        let md = render(&r);
        assert!(md.contains("| Exists | ❌ no |"));
        assert!(!md.contains("usermod"));
    }

    #[test]
    fn non_200_adds_http_section() {
        let mut r = minimal();
        r.web_access.http_code = "503".into();
        r.web_access.status = WebStatus::ServiceUnavailable;
        let md = render(&r);
        assert!(md.contains("#### HTTP 503"));
        assert!(md.contains("| Status | ❌ service_unavailable |"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut r = minimal();
        r.services.insert("lokole_gunicorn".into(), ServiceInfo::with_status(ServiceStatus::Fatal));
        assert_eq!(render(&r), render(&r));
    }
}
