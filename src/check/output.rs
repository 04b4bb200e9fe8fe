//! 输出层：接收 VerificationReport，渲染 text / json / markdown

use std::io::Write;
use std::str::FromStr;

use crate::check::markdown;
use crate::check::report::{ServiceStatus, VerificationReport};
use crate::check::tally::{CheckResult, Outcome};
use crate::utils::{Result, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Markdown,
}

impl FromStr for Format {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "markdown" | "md" => Ok(Format::Markdown),
            other => Err(VerifyError::Config(format!("unknown format: {}", other))),
        }
    }
}

pub fn display(report: &VerificationReport, results: &[CheckResult], format: Format) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_report(&mut handle, report, results, format)
}

pub fn write_report(
    w: &mut dyn Write,
    report: &VerificationReport,
    results: &[CheckResult],
    format: Format,
) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut *w, report)?;
            writeln!(w)?;
        }
        Format::Markdown => w.write_all(markdown::render(report).as_bytes())?,
        Format::Text => write_text(w, report, results)?,
    }
    Ok(())
}

// ── Text ────────────────────────────────────────────────────────────────────

fn write_text(w: &mut dyn Write, r: &VerificationReport, results: &[CheckResult]) -> std::io::Result<()> {
    print_section(w, "REPORT")?;
    writeln!(w, "  VM           : {}", r.vm_name)?;
    writeln!(w, "  Collected at : {}", r.timestamp)?;

    // ── System ────────────────────────────────────────────────────────────
    print_section(w, "SYSTEM")?;
    let s = &r.system;
    writeln!(w, "  OS           : {} ({})", s.os_version, s.os_codename)?;
    writeln!(w, "  Kernel       : {}", s.kernel)?;
    writeln!(w, "  Python       : {}  [{}]", s.python_version, s.python_major_minor)?;

    // ── Services ──────────────────────────────────────────────────────────
    print_section(w, &format!("SERVICES ({})", r.services.len()))?;
    for (name, svc) in &r.services {
        let icon = match svc.status {
            ServiceStatus::Running => "●",
            ServiceStatus::Unknown => "?",
            _ => "○",
        };
        let extra = match (&svc.pid, &svc.uptime) {
            (Some(pid), Some(up)) => format!("  pid={}  uptime={}", pid, up),
            _ => String::new(),
        };
        writeln!(w, "  {} {:<24} [{}]{}", icon, name, svc.status, extra)?;
    }

    // ── Socket ────────────────────────────────────────────────────────────
    print_section(w, "SOCKET")?;
    let k = &r.socket;
    if k.exists {
        writeln!(w, "  Owner        : {}:{}  mode {}", k.owner, k.group, k.permissions)?;
        writeln!(
            w,
            "  www-data     : {}",
            if k.www_data_in_group { "in group" } else { "NOT in group ⚠" }
        )?;
    } else {
        writeln!(w, "  ✗ socket not found")?;
    }

    // ── Web ───────────────────────────────────────────────────────────────
    print_section(w, "WEB ACCESS")?;
    let web = &r.web_access;
    writeln!(w, "  HTTP         : {} ({})  {} ms", web.http_code, web.status, web.response_time_ms)?;

    // ── Logs ──────────────────────────────────────────────────────────────
    if !r.logs.is_empty() {
        print_section(w, "LOG ERRORS")?;
        for (name, count) in &r.logs {
            let warn = if *count > 0 { " ⚠" } else { "" };
            writeln!(w, "  {:<24} {}{}", name, count, warn)?;
        }
    }

    // ── Checks ────────────────────────────────────────────────────────────
    print_section(w, "CHECKS")?;
    for c in results {
        let mark = match c.outcome {
            Outcome::Pass => "PASS",
            Outcome::Warning => "WARN",
            Outcome::Fail => "FAIL",
        };
        writeln!(w, "  [{}] {:<28} {}", mark, c.name, c.detail)?;
    }
    let n = &r.checks;
    writeln!(
        w,
        "\n  {} total  {} passed  {} warnings  {} failed  =>  {}",
        n.total, n.passed, n.warnings, n.failed, r.summary
    )?;

    Ok(())
}

// ── 格式化工具 ───────────────────────────────────────────────────────────────

fn print_section(w: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(w, "\n{}", "─".repeat(60))?;
    writeln!(w, "  {}", title)?;
    writeln!(w, "{}", "─".repeat(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!("text".parse::<Format>().expect("text"), Format::Text);
        assert_eq!("json".parse::<Format>().expect("json"), Format::Json);
        assert_eq!("md".parse::<Format>().expect("md"), Format::Markdown);
        assert!("yaml".parse::<Format>().is_err());
    }
}
