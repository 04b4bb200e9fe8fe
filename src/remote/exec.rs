//! 基于 std::process 的执行器，带超时

use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;

use super::{CommandOutput, Executor, Target};
use crate::utils::{Result, VerifyError};

const POLL_STEP: Duration = Duration::from_millis(50);
const TERM_GRACE: Duration = Duration::from_millis(500);

pub struct ShellExecutor {
    target: Target,
    timeout: Duration,
}

impl ShellExecutor {
    pub fn new(target: Target, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// argv for running `script` on the target.
    pub fn argv(&self, script: &str) -> Vec<String> {
        let mut argv: Vec<String> = match &self.target {
            Target::Local => vec!["bash".into(), "-c".into()],
            Target::Multipass { vm } => vec![
                "multipass".into(),
                "exec".into(),
                vm.clone(),
                "--".into(),
                "bash".into(),
                "-c".into(),
            ],
            Target::Ssh { host, user, port } => vec![
                "ssh".into(),
                "-o".into(),
                "BatchMode=yes".into(),
                "-o".into(),
                "StrictHostKeyChecking=accept-new".into(),
                "-p".into(),
                port.to_string(),
                format!("{}@{}", user, host),
            ],
        };
        argv.push(script.to_string());
        argv
    }
}

impl Executor for ShellExecutor {
    fn run(&self, script: &str) -> Result<CommandOutput> {
        let argv = self.argv(script);
        tracing::trace!(dest = %self.target, script, "exec");

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // 独立进程组：超时时连同孙进程一起终止，管道才会关闭
            .process_group(0)
            .spawn()
            .map_err(|e| VerifyError::Remote(format!("{} failed to start: {}", argv[0], e)))?;

        // 管道必须并行读，否则输出过大时子进程会阻塞
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let code = wait_with_timeout(&mut child, self.timeout)?;

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        Ok(match code {
            Some(code) => CommandOutput { code, stdout, stderr },
            None => CommandOutput {
                code: -1,
                stdout,
                stderr: "command timed out".to_string(),
            },
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// `Some(exit code)` when the child finished, `None` when it was killed
/// after `timeout`. A signal-terminated child reports `-1`.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<i32>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status.code().unwrap_or(-1)));
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_STEP);
    }

    tracing::warn!(pid = child.id(), timeout_s = timeout.as_secs(), "command timed out, terminating");
    let group = Pid::from_raw(child.id() as i32);
    let _ = killpg(group, Signal::SIGTERM);

    let grace = Instant::now() + TERM_GRACE;
    while Instant::now() < grace {
        if child.try_wait()?.is_some() {
            // bash may exit on SIGTERM while a child ignores it
            let _ = killpg(group, Signal::SIGKILL);
            return Ok(None);
        }
        thread::sleep(POLL_STEP);
    }
    let _ = killpg(group, Signal::SIGKILL);
    let _ = child.wait();
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipass_argv_wraps_script_in_bash() {
        let exec = ShellExecutor::new(
            Target::Multipass { vm: "iiab-lokole-test".into() },
            Duration::from_secs(30),
        );
        assert_eq!(
            exec.argv("uname -r"),
            vec!["multipass", "exec", "iiab-lokole-test", "--", "bash", "-c", "uname -r"]
        );
    }

    #[test]
    fn ssh_argv_uses_port_and_login() {
        let exec = ShellExecutor::new(
            Target::Ssh { host: "10.1.2.3".into(), user: "azureuser".into(), port: 2222 },
            Duration::from_secs(30),
        );
        let argv = exec.argv("true");
        assert_eq!(argv[0], "ssh");
        assert!(argv.windows(2).any(|w| w[0] == "-p" && w[1] == "2222"));
        assert_eq!(argv[argv.len() - 2], "azureuser@10.1.2.3");
        assert_eq!(argv[argv.len() - 1], "true");
    }

    #[test]
    fn local_run_captures_stdout_and_code() {
        let exec = ShellExecutor::new(Target::Local, Duration::from_secs(10));
        let out = exec.run("echo hello; echo oops >&2; exit 3").expect("bash should run");
        assert_eq!(out.code, 3);
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn local_run_times_out() {
        let exec = ShellExecutor::new(Target::Local, Duration::from_millis(200));
        let started = Instant::now();
        let out = exec.run("sleep 5").expect("bash should run");
        assert_eq!(out.code, -1);
        assert_eq!(out.stderr, "command timed out");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_also_stops_grandchildren() {
        let exec = ShellExecutor::new(Target::Local, Duration::from_millis(200));
        let started = Instant::now();
        let out = exec.run("sleep 4; echo done").expect("bash should run");
        assert_eq!(out.code, -1);
        assert!(!out.stdout.contains("done"));
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    }

    #[test]
    fn timeout_stops_pipelines() {
        let exec = ShellExecutor::new(Target::Local, Duration::from_millis(200));
        let started = Instant::now();
        let out = exec.run("sleep 4 | cat; echo after").expect("bash should run");
        assert_eq!(out.stderr, "command timed out");
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    }
}
