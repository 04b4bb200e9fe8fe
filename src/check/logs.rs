//! 日志错误行计数

use std::collections::BTreeMap;

use crate::remote::{capture, Executor};

pub fn collect(exec: &dyn Executor, sources: &BTreeMap<String, String>) -> BTreeMap<String, u64> {
    sources
        .iter()
        .map(|(name, path)| {
            // grep -c 在 0 匹配时退出码为 1，capture 会回落到 "0"
            let raw = capture(exec, &format!("sudo grep -ci 'error' '{}' 2>/dev/null", path), "0");
            (name.clone(), parse_count(&raw))
        })
        .collect()
}

/// Digits only; anything else counts as zero.
pub fn parse_count(raw: &str) -> u64 {
    let s = raw.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    s.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::ScriptedExecutor;

    #[test]
    fn counts_are_revalidated() {
        assert_eq!(parse_count("12\n"), 12);
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("12 errors"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("99999999999999999999999"), 0);
    }

    #[test]
    fn collect_per_source() {
        let exec = ScriptedExecutor::new()
            .ok("/var/log/nginx/error.log", "4\n")
            .exit("gunicorn", 2, "");
        let sources: BTreeMap<String, String> = [
            ("nginx_errors".to_string(), "/var/log/nginx/error.log".to_string()),
            ("gunicorn_errors".to_string(), "/home/lokole/state/gunicorn.log".to_string()),
        ]
        .into_iter()
        .collect();
        let logs = collect(&exec, &sources);
        assert_eq!(logs["nginx_errors"], 4);
        assert_eq!(logs["gunicorn_errors"], 0);
    }
}
