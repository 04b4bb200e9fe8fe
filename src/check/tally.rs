//! 判定规则：逐项 pass / warning / fail，汇总为 PASSED / WARNING / FAILED

use crate::check::report::{CheckCounts, ServiceStatus, Summary, VerificationReport, WebStatus};
use crate::check::system::{classify_python, PythonSupport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Warning,
    Fail,
}

impl Outcome {
    pub fn icon(self) -> &'static str {
        match self {
            Outcome::Pass => "✅",
            Outcome::Warning => "⚠️",
            Outcome::Fail => "❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub outcome: Outcome,
    pub detail: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self { name: name.into(), outcome, detail: detail.into() }
    }
}

/// One result per python / service / socket / web / log source, in that order.
pub fn evaluate(report: &VerificationReport) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let mm = &report.system.python_major_minor;
    results.push(match classify_python(mm) {
        PythonSupport::Supported => CheckResult::new("python", Outcome::Pass, format!("Python {} supported", mm)),
        PythonSupport::OlderSupported => CheckResult::new(
            "python",
            Outcome::Warning,
            format!("Python {} is older but supported", mm),
        ),
        PythonSupport::Unsupported => {
            CheckResult::new("python", Outcome::Fail, format!("Python {} is not supported", mm))
        }
        PythonSupport::Unknown => CheckResult::new("python", Outcome::Warning, "Python version unknown"),
    });

    for (name, svc) in &report.services {
        let outcome = match svc.status {
            ServiceStatus::Running => Outcome::Pass,
            ServiceStatus::Unknown => Outcome::Warning,
            ServiceStatus::Stopped
            | ServiceStatus::Fatal
            | ServiceStatus::Error
            | ServiceStatus::NotFound => Outcome::Fail,
        };
        results.push(CheckResult::new(format!("service:{}", name), outcome, svc.status.to_string()));
    }

    let sock = &report.socket;
    results.push(if !sock.exists {
        CheckResult::new("socket", Outcome::Fail, "socket not found")
    } else if !sock.www_data_in_group {
        CheckResult::new(
            "socket",
            Outcome::Warning,
            format!("www-data is not in group {}", sock.group),
        )
    } else {
        CheckResult::new("socket", Outcome::Pass, "socket accessible by www-data")
    });

    let web = &report.web_access;
    results.push(if web.status == WebStatus::Accessible {
        CheckResult::new("web_access", Outcome::Pass, format!("HTTP {}", web.http_code))
    } else {
        CheckResult::new("web_access", Outcome::Fail, format!("HTTP {} ({})", web.http_code, web.status))
    });

    for (name, count) in &report.logs {
        let outcome = if *count == 0 { Outcome::Pass } else { Outcome::Warning };
        results.push(CheckResult::new(format!("log:{}", name), outcome, format!("{} error lines", count)));
    }

    results
}

pub fn count(results: &[CheckResult]) -> CheckCounts {
    let mut c = CheckCounts::default();
    for r in results {
        c.total += 1;
        match r.outcome {
            Outcome::Pass => c.passed += 1,
            Outcome::Warning => c.warnings += 1,
            Outcome::Fail => c.failed += 1,
        }
    }
    c
}

/// Any failure fails the run; warnings only matter above `warning_threshold`.
pub fn summarize(counts: &CheckCounts, warning_threshold: u32) -> Summary {
    if counts.failed > 0 {
        Summary::Failed
    } else if counts.warnings > warning_threshold {
        Summary::Warning
    } else {
        Summary::Passed
    }
}

/// Recompute `checks` and `summary` from the collected fields.
pub fn apply(report: &mut VerificationReport, warning_threshold: u32) -> Vec<CheckResult> {
    let results = evaluate(report);
    report.checks = count(&results);
    report.summary = summarize(&report.checks, warning_threshold);
    results
}
