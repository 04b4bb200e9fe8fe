//! HTTP 探测：经 nginx 访问 Lokole 页面

use crate::check::report::{WebAccess, WebStatus};
use crate::remote::{capture, Executor};

pub fn probe(exec: &dyn Executor, url: &str) -> WebAccess {
    let raw = capture(
        exec,
        &format!(
            "curl -s -o /dev/null -w '%{{http_code}} %{{time_total}}' --max-time 10 '{}'",
            url
        ),
        "",
    );
    parse_probe(&raw)
}

/// `"<http_code> <seconds>"` as printed by curl's `-w`.
pub fn parse_probe(raw: &str) -> WebAccess {
    let mut parts = raw.split_whitespace();
    let http_code = parts
        .next()
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_digit()))
        .unwrap_or("000")
        .to_string();
    let response_time_ms = parts
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| (s * 1000.0).round() as u64)
        .unwrap_or(0);

    WebAccess {
        status: classify_http(&http_code),
        http_code,
        response_time_ms,
    }
}

pub fn classify_http(code: &str) -> WebStatus {
    match code.trim() {
        "200" => WebStatus::Accessible,
        "502" => WebStatus::BadGateway,
        "503" => WebStatus::ServiceUnavailable,
        "000" | "" => WebStatus::ConnectionFailed,
        _ => WebStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::ScriptedExecutor;

    #[test]
    fn http_code_mapping() {
        assert_eq!(classify_http("200"), WebStatus::Accessible);
        assert_eq!(classify_http("502"), WebStatus::BadGateway);
        assert_eq!(classify_http("503"), WebStatus::ServiceUnavailable);
        assert_eq!(classify_http("000"), WebStatus::ConnectionFailed);
        assert_eq!(classify_http("404"), WebStatus::Error);
        assert_eq!(classify_http("301"), WebStatus::Error);
    }

    #[test]
    fn parse_curl_output() {
        let w = parse_probe("200 0.052341");
        assert_eq!(w.http_code, "200");
        assert_eq!(w.status, WebStatus::Accessible);
        assert_eq!(w.response_time_ms, 52);
    }

    #[test]
    fn malformed_output_is_connection_failure() {
        let w = parse_probe("");
        assert_eq!(w.http_code, "000");
        assert_eq!(w.status, WebStatus::ConnectionFailed);
        assert_eq!(w.response_time_ms, 0);

        let w = parse_probe("abc nan-ish");
        assert_eq!(w.http_code, "000");
        assert_eq!(w.response_time_ms, 0);
    }

    #[test]
    fn probe_uses_curl() {
        let exec = ScriptedExecutor::new().ok("curl -s", "502 1.5");
        let w = probe(&exec, "http://localhost/lokole/");
        assert_eq!(w.status, WebStatus::BadGateway);
        assert_eq!(w.response_time_ms, 1500);
    }
}
