//! gunicorn Unix socket 检查：存在性、属主、权限，www-data 能否访问

use crate::check::report::SocketInfo;
use crate::remote::{capture, Executor};

const UNKNOWN: &str = "unknown";

pub fn collect(exec: &dyn Executor, path: &str) -> SocketInfo {
    let stat = capture(exec, &format!("stat -c '%U %G %a' '{}' 2>/dev/null", path), "");
    let groups = capture(exec, "id -nG www-data 2>/dev/null", "");
    parse(&stat, &groups)
}

/// `stat` is `"<owner> <group> <octal perms>"`, `groups` the output of
/// `id -nG www-data`. Empty `stat` means the socket does not exist.
pub fn parse(stat: &str, groups: &str) -> SocketInfo {
    let parts: Vec<&str> = stat.split_whitespace().collect();
    if parts.len() < 3 {
        return SocketInfo {
            exists: false,
            owner: UNKNOWN.to_string(),
            group: UNKNOWN.to_string(),
            permissions: UNKNOWN.to_string(),
            www_data_in_group: false,
        };
    }

    let group = parts[1].to_string();
    let www_data_in_group = groups.split_whitespace().any(|g| g == group);

    SocketInfo {
        exists: true,
        owner: parts[0].to_string(),
        group,
        permissions: parts[2].to_string(),
        www_data_in_group,
    }
}
