//! 系统层信息收集
//! 来源：lsb_release, uname, python3 --version

use regex::Regex;
use std::sync::OnceLock;

use crate::check::report::SystemInfo;
use crate::remote::{capture, Executor};

const UNKNOWN: &str = "unknown";

/// Where a Python release stands for the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PythonSupport {
    Supported,
    /// 3.10 / 3.11: works, flagged as a warning
    OlderSupported,
    Unsupported,
    Unknown,
}

pub fn collect(exec: &dyn Executor) -> SystemInfo {
    let os_version = capture(exec, "lsb_release -rs 2>/dev/null", UNKNOWN);
    let os_codename = capture(exec, "lsb_release -cs 2>/dev/null", UNKNOWN);
    let kernel = capture(exec, "uname -r", UNKNOWN);
    let python_version = python_version(&capture(exec, "python3 --version 2>&1", ""));
    let python_major_minor = major_minor(&python_version).unwrap_or_else(|| UNKNOWN.to_string());

    SystemInfo {
        os_version,
        os_codename,
        kernel,
        python_version,
        python_major_minor,
    }
}

/// "Python 3.12.3" → "3.12.3"
fn python_version(raw: &str) -> String {
    let v = raw.trim().trim_start_matches("Python").trim();
    if v.is_empty() {
        UNKNOWN.to_string()
    } else {
        v.to_string()
    }
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.(\d+)").expect("static regex"))
}

/// "3.12.3" → "3.12"
pub fn major_minor(version: &str) -> Option<String> {
    let caps = version_re().captures(version.trim())?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

pub fn classify_python(major_minor: &str) -> PythonSupport {
    let Some(caps) = version_re().captures(major_minor.trim()) else {
        return PythonSupport::Unknown;
    };
    let (Ok(major), Ok(minor)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
        return PythonSupport::Unknown;
    };

    match (major, minor) {
        (3, 12..=99) => PythonSupport::Supported,
        (3, 10..=11) => PythonSupport::OlderSupported,
        (0..=3, _) => PythonSupport::Unsupported,
        _ => PythonSupport::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::ScriptedExecutor;

    #[test]
    fn python_classification_boundaries() {
        assert_eq!(classify_python("3.12"), PythonSupport::Supported);
        assert_eq!(classify_python("3.13"), PythonSupport::Supported);
        assert_eq!(classify_python("3.99"), PythonSupport::Supported);
        assert_eq!(classify_python("3.10"), PythonSupport::OlderSupported);
        assert_eq!(classify_python("3.11"), PythonSupport::OlderSupported);
        assert_eq!(classify_python("3.9"), PythonSupport::Unsupported);
        assert_eq!(classify_python("3.6"), PythonSupport::Unsupported);
        assert_eq!(classify_python("2.7"), PythonSupport::Unsupported);
    }

    #[test]
    fn python_classification_unparseable() {
        assert_eq!(classify_python("unknown"), PythonSupport::Unknown);
        assert_eq!(classify_python(""), PythonSupport::Unknown);
        assert_eq!(classify_python("4.0"), PythonSupport::Unknown);
    }

    #[test]
    fn major_minor_extraction() {
        assert_eq!(major_minor("3.12.3").as_deref(), Some("3.12"));
        assert_eq!(major_minor("3.10").as_deref(), Some("3.10"));
        assert_eq!(major_minor("unknown"), None);
    }

    #[test]
    fn collect_fills_every_field() {
        let exec = ScriptedExecutor::new()
            .ok("lsb_release -rs", "24.04\n")
            .ok("lsb_release -cs", "noble\n")
            .ok("uname -r", "6.8.0-41-generic\n")
            .ok("python3 --version", "Python 3.12.3\n");
        let sys = collect(&exec);
        assert_eq!(sys.os_version, "24.04");
        assert_eq!(sys.os_codename, "noble");
        assert_eq!(sys.kernel, "6.8.0-41-generic");
        assert_eq!(sys.python_version, "3.12.3");
        assert_eq!(sys.python_major_minor, "3.12");
    }

    #[test]
    fn collect_defaults_to_unknown() {
        let sys = collect(&ScriptedExecutor::new());
        assert_eq!(sys.os_version, "unknown");
        assert_eq!(sys.kernel, "unknown");
        assert_eq!(sys.python_version, "unknown");
        assert_eq!(sys.python_major_minor, "unknown");
    }
}
