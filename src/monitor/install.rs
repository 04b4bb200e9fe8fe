//! 安装过程轮询：等待 ansible 安装日志出现 RECAP

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::monitor::sleep_unless_stopped;
use crate::remote::Executor;
use crate::utils::{Result, VerifyError};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;
/// 3 hours at the default interval
pub const DEFAULT_MAX_POLLS: u32 = 90;

const INSTALL_LOG: &str = "/opt/iiab/iiab/iiab-install.log";

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_polls: u32,
}

/// Timestamped lines to stdout and, when opened, a log file.
pub struct PollLog {
    file: Option<File>,
}

impl PollLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Some(file) })
    }

    pub fn console_only() -> Self {
        Self { file: None }
    }

    pub fn line(&mut self, msg: &str) {
        let stamped = format!("[{}] {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
        println!("{}", stamped);
        if let Some(f) = self.file.as_mut() {
            if let Err(e) = writeln!(f, "{}", stamped) {
                tracing::warn!(error = %e, "cannot write monitor log");
            }
        }
    }
}

pub fn default_log_name() -> String {
    format!("installation-monitor-{}.log", chrono::Local::now().format("%Y%m%d-%H%M%S"))
}

pub fn installation_complete(vm: &dyn Executor) -> bool {
    vm.run(&format!("grep -q RECAP {} 2>/dev/null", INSTALL_LOG))
        .map(|o| o.success())
        .unwrap_or(false)
}

pub fn installer_running(vm: &dyn Executor) -> bool {
    vm.run("pgrep -f ansible-playbook > /dev/null")
        .map(|o| o.success())
        .unwrap_or(false)
}

/// Second column of the `multipass list` row for `vm_name`.
pub fn parse_vm_state(list_output: &str, vm_name: &str) -> String {
    list_output
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .find(|cols| cols.first() == Some(&vm_name))
        .and_then(|cols| cols.get(1).map(|s| s.to_string()))
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn vm_state(host: &dyn Executor, vm_name: &str) -> String {
    match host.run("multipass list") {
        Ok(o) if o.success() => parse_vm_state(&o.stdout, vm_name),
        _ => "Unknown".to_string(),
    }
}

/// Poll until the installer log shows a RECAP. `Ok(true)` when complete,
/// `Ok(false)` when `max_polls` ran out, `Err(Interrupted)` when `stop` was raised.
/// Only the first two close the log with "Monitoring complete!".
pub fn wait_for_install(
    vm: &dyn Executor,
    host: &dyn Executor,
    vm_name: &str,
    settings: PollSettings,
    log: &mut PollLog,
    stop: &AtomicBool,
) -> Result<bool> {
    log.line("🔄 Starting installation monitor");
    log.line(&"=".repeat(80));
    log.line(&format!("VM: {}", vm_name));
    log.line(&format!(
        "Polling every {}s, at most {} polls",
        settings.interval.as_secs(),
        settings.max_polls
    ));
    log.line(&"=".repeat(80));

    let mut complete = false;
    for poll in 1..=settings.max_polls {
        log.line(&format!("⏱️ Poll #{}: checking installation status...", poll));

        if installation_complete(vm) {
            log.line("✅ Installation COMPLETE!");
            complete = true;
            break;
        }

        if installer_running(vm) {
            log.line("   ⏳ Installation still in progress...");
        } else {
            log.line("   ⚠️ Installation process not detected");
        }
        log.line(&format!("   VM status: {}", vm_state(host, vm_name)));

        if poll < settings.max_polls && !sleep_unless_stopped(settings.interval, stop) {
            log.line("⚠️ Monitoring interrupted by user");
            return Err(VerifyError::Interrupted);
        }
    }

    if !complete {
        log.line("❌ Maximum polling time reached");
    }
    log.line("✅ Monitoring complete!");
    Ok(complete)
}
