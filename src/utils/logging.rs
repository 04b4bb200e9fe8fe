//! tracing 初始化：日志统一写 stderr，stdout 留给报告输出

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::utils::{Result, VerifyError};

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// `format` is `"text"` or `"json"`.
pub fn init(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let res = match format {
        "text" => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => {
            return Err(VerifyError::Config(format!(
                "unknown log format '{}', expected 'text' or 'json'",
                other
            )))
        }
    };

    res.map_err(|e| VerifyError::System(format!("tracing init: {}", e)))
}
