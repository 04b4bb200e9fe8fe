//! 资源采样：CPU / 内存 / 磁盘，后台线程定时执行
//!
//! The sampler thread owns its executor handle and its sample buffer; the
//! only state shared with the caller is the stop flag.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::monitor::sleep_unless_stopped;
use crate::remote::{capture, Executor};
use crate::utils::Result;

const SAMPLE_SCRIPT: &str = "top -bn1 | grep -m1 'Cpu(s)'; \
free -m | awk '/^Mem:/ {print $2, $3}'; \
df -P / | awk 'NR==2 {print $5}'";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp: String,
    pub cpu_percent: f64,
    pub mem_used_percent: f64,
    pub disk_used_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourcePeaks {
    pub samples: usize,
    pub cpu_percent: f64,
    pub mem_used_percent: f64,
    pub disk_used_percent: f64,
}

pub fn sample_once(exec: &dyn Executor) -> ResourceSample {
    let raw = capture(exec, SAMPLE_SCRIPT, "");
    parse_sample(&raw, chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Three lines: the `top` Cpu line, `"<total> <used>"` MiB, and the `df` use%.
/// A malformed line yields 0.0 for its field.
pub fn parse_sample(raw: &str, timestamp: String) -> ResourceSample {
    let mut lines = raw.lines().map(str::trim);
    let cpu_line = lines.next().unwrap_or("");
    let mem_line = lines.next().unwrap_or("");
    let disk_line = lines.next().unwrap_or("");

    ResourceSample {
        timestamp,
        cpu_percent: parse_cpu(cpu_line),
        mem_used_percent: parse_mem(mem_line),
        disk_used_percent: parse_disk(disk_line),
    }
}

/// `%Cpu(s):  3.1 us,  1.0 sy,  0.0 ni, 95.5 id, ...` → 4.5
fn parse_cpu(line: &str) -> f64 {
    let body = line.split_once(':').map(|(_, b)| b).unwrap_or("");
    body.split(',')
        .map(str::trim)
        .find(|f| f.ends_with("id"))
        .and_then(|f| f.trim_end_matches("id").trim().parse::<f64>().ok())
        .filter(|idle| (0.0..=100.0).contains(idle))
        .map(|idle| round1(100.0 - idle))
        .unwrap_or(0.0)
}

fn parse_mem(line: &str) -> f64 {
    let mut parts = line.split_whitespace().map(|v| v.parse::<f64>().ok());
    match (parts.next().flatten(), parts.next().flatten()) {
        (Some(total), Some(used)) if total > 0.0 => round1(used / total * 100.0),
        _ => 0.0,
    }
}

fn parse_disk(line: &str) -> f64 {
    line.trim_end_matches('%').parse().unwrap_or(0.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn peaks(samples: &[ResourceSample]) -> ResourcePeaks {
    samples.iter().fold(
        ResourcePeaks { samples: samples.len(), ..Default::default() },
        |p, s| ResourcePeaks {
            samples: p.samples,
            cpu_percent: p.cpu_percent.max(s.cpu_percent),
            mem_used_percent: p.mem_used_percent.max(s.mem_used_percent),
            disk_used_percent: p.disk_used_percent.max(s.disk_used_percent),
        },
    )
}

fn append_line(path: &Path, sample: &ResourceSample) -> Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{}", serde_json::to_string(sample)?)?;
    Ok(())
}

/// Background sampler; dropped or stopped, the thread exits within one poll step.
pub struct ResourceSampler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Vec<ResourceSample>>>,
}

impl ResourceSampler {
    pub fn start(
        exec: Arc<dyn Executor + Send + Sync>,
        interval: Duration,
        sink: Option<PathBuf>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut samples = Vec::new();
            while !flag.load(Ordering::SeqCst) {
                let s = sample_once(exec.as_ref());
                tracing::debug!(cpu = s.cpu_percent, mem = s.mem_used_percent, disk = s.disk_used_percent, "resource sample");
                if let Some(path) = &sink {
                    if let Err(e) = append_line(path, &s) {
                        tracing::warn!(path = %path.display(), error = %e, "cannot write resource sample");
                    }
                }
                samples.push(s);
                if !sleep_unless_stopped(interval, &flag) {
                    break;
                }
            }
            samples
        });

        Self { stop, handle: Some(handle) }
    }

    /// Stop the thread and hand back everything it sampled.
    pub fn stop(mut self) -> Vec<ResourceSample> {
        self.stop.store(true, Ordering::SeqCst);
        self.handle
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// `resources` subcommand: sample in the foreground until `count` samples
/// were taken or `stop` is raised.
pub fn run_foreground(
    exec: &dyn Executor,
    interval: Duration,
    count: Option<u32>,
    sink: Option<PathBuf>,
    stop: &AtomicBool,
) -> Result<ResourcePeaks> {
    let mut samples: Vec<ResourceSample> = Vec::new();
    while count.map_or(true, |n| samples.len() < n as usize) {
        if !samples.is_empty() && !sleep_unless_stopped(interval, stop) {
            break;
        }
        let s = sample_once(exec);
        println!(
            "[{}] cpu {:>5.1}%  mem {:>5.1}%  disk {:>5.1}%",
            s.timestamp, s.cpu_percent, s.mem_used_percent, s.disk_used_percent
        );
        if let Some(path) = &sink {
            append_line(path, &s)?;
        }
        samples.push(s);
    }
    Ok(peaks(&samples))
}
