pub mod logs;
pub mod markdown;
pub mod output;
pub mod report;
pub mod services;
pub mod socket;
pub mod system;
pub mod tally;
pub mod web;

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::remote::Executor;
use crate::utils::Result;
use output::Format;
use report::VerificationReport;
use tally::CheckResult;

pub struct VerifyOptions {
    pub format: Format,
    /// JSON report file
    pub output: PathBuf,
    pub markdown: Option<PathBuf>,
    /// Ubuntu release the VM was provisioned from, if known
    pub expected_os: Option<String>,
}

/// Run every probe against the target and derive the checks.
pub fn collect(exec: &dyn Executor, cfg: &Config) -> (VerificationReport, Vec<CheckResult>) {
    tracing::info!(vm = %cfg.vm_name, "Collecting system information...");
    let system = system::collect(exec);

    tracing::info!(count = cfg.services.len(), "Checking supervisor services...");
    let services = services::collect(exec, &cfg.services);

    tracing::info!(path = %cfg.socket_path, "Checking gunicorn socket...");
    let socket = socket::collect(exec, &cfg.socket_path);

    tracing::info!(url = %cfg.web_url, "Probing web access...");
    let web_access = web::probe(exec, &cfg.web_url);

    tracing::info!("Counting log errors...");
    let logs = logs::collect(exec, &cfg.logs);

    let mut report = VerificationReport {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        vm_name: cfg.vm_name.clone(),
        system,
        services,
        socket,
        web_access,
        logs,
        checks: Default::default(),
        summary: report::Summary::Passed,
    };
    let results = tally::apply(&mut report, cfg.warning_threshold);
    (report, results)
}

/// `verify` subcommand: collect, persist, print. Returns the process exit code.
pub fn run_verify(exec: &dyn Executor, cfg: &Config, opts: &VerifyOptions) -> Result<i32> {
    let (report, results) = collect(exec, cfg);

    if let Some(expected) = &opts.expected_os {
        if !os_matches(expected, &report.system.os_version) {
            tracing::warn!(
                expected = %expected,
                detected = %report.system.os_version,
                "Ubuntu version mismatch"
            );
        }
    }

    write_json(&report, &opts.output)?;
    tracing::info!(path = %opts.output.display(), "report written");

    if let Some(md_path) = &opts.markdown {
        std::fs::write(md_path, markdown::render(&report))?;
        tracing::info!(path = %md_path.display(), "markdown written");
    }

    output::display(&report, &results, opts.format)?;

    let c = &report.checks;
    tracing::info!(
        summary = %report.summary,
        passed = c.passed,
        warnings = c.warnings,
        failed = c.failed,
        "verification finished"
    );
    Ok(report.summary.exit_code())
}

/// `render` subcommand: report JSON → markdown.
pub fn run_render(input: &Path, output: Option<&Path>) -> Result<()> {
    let report = read_report(input)?;
    let md = markdown::render(&report);
    match output {
        Some(p) => std::fs::write(p, md)?,
        None => print!("{}", md),
    }
    Ok(())
}

pub fn read_report(path: &Path) -> Result<VerificationReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(VerificationReport::from_json(&content)?)
}

/// `24.04` matches `24.04`; an unknown detected version never matches.
pub fn os_matches(expected: &str, detected: &str) -> bool {
    let expected = expected.trim();
    !expected.is_empty() && expected == detected.trim()
}

pub fn write_json(report: &VerificationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::ScriptedExecutor;

    fn healthy_vm() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .ok("lsb_release -rs", "24.04")
            .ok("lsb_release -cs", "noble")
            .ok("uname -r", "6.8.0-31-generic")
            .ok("python3 --version", "Python 3.12.3")
            .ok("supervisorctl status lokole_gunicorn", "lokole_gunicorn   RUNNING   pid 901, uptime 0:10:00")
            .ok("supervisorctl status lokole_celery_beat", "lokole_celery_beat   RUNNING   pid 902, uptime 0:10:00")
            .ok("supervisorctl status lokole_celery_worker", "lokole_celery_worker   RUNNING   pid 903, uptime 0:10:00")
            .ok("supervisorctl status lokole_restarter", "lokole_restarter   RUNNING   pid 904, uptime 0:10:00")
            .ok("stat -c", "lokole www-data 770")
            .ok("id -nG www-data", "www-data lokole")
            .ok("curl", "200 0.042")
            .ok("grep -ci", "0")
    }

    #[test]
    fn healthy_vm_passes() {
        let exec = healthy_vm();
        let (report, results) = collect(&exec, &Config::default());
        assert_eq!(report.summary, report::Summary::Passed);
        assert_eq!(report.system.python_major_minor, "3.12");
        assert_eq!(report.web_access.response_time_ms, 42);
        assert_eq!(report.checks.failed, 0);
        assert_eq!(report.checks.total as usize, results.len());
    }

    #[test]
    fn unreachable_vm_fails_without_erroring() {
        let exec = ScriptedExecutor::new();
        let (report, _) = collect(&exec, &Config::default());
        assert_eq!(report.summary, report::Summary::Failed);
        assert_eq!(report.system.os_version, "unknown");
        assert!(!report.socket.exists);
        assert_eq!(report.web_access.http_code, "000");
    }

    #[test]
    fn verify_writes_report_and_markdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = VerifyOptions {
            format: Format::Json,
            output: dir.path().join("report.json"),
            markdown: Some(dir.path().join("report.md")),
            expected_os: Some("22.04".to_string()),
        };
        let code = run_verify(&healthy_vm(), &Config::default(), &opts).expect("verify");
        assert_eq!(code, 0);

        let back = read_report(&opts.output).expect("read back");
        assert_eq!(back.system.os_codename, "noble");
        let md = std::fs::read_to_string(dir.path().join("report.md")).expect("markdown");
        assert!(md.contains("PASSED"));
    }

    #[test]
    fn failed_verify_exits_one_and_still_writes_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let opts = VerifyOptions {
            format: Format::Json,
            output: dir.path().join("failed.json"),
            markdown: None,
            expected_os: None,
        };
        let code = run_verify(&ScriptedExecutor::new(), &Config::default(), &opts).expect("verify");
        assert_eq!(code, 1);

        let back = read_report(&opts.output).expect("report written despite failure");
        assert_eq!(back.summary, report::Summary::Failed);
        assert!(back.checks.failed > 0);
    }

    #[test]
    fn os_version_comparison() {
        assert!(os_matches("24.04", "24.04\n"));
        assert!(!os_matches("22.04", "24.04"));
        assert!(!os_matches("", "unknown"));
    }
}
