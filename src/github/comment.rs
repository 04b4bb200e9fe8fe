//! issue / PR 评论：新建或按隐藏标记更新

use serde::Deserialize;
use serde_json::json;

use super::{GitHubClient, Method, RepoSlug};
use crate::utils::Result;

/// GitHub rejects comment bodies longer than this many characters.
pub const MAX_BODY_CHARS: usize = 65_536;
const PAGE_SIZE: usize = 100;
const TRUNCATION_NOTICE: &str = "\n\n_Report truncated; see the workflow artifacts for the full text._\n";

#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// Hidden HTML comment identifying reports for one VM.
pub fn marker_for(vm_name: &str) -> String {
    format!("<!-- iiab-verify:{} -->", vm_name)
}

/// Prefix `marker` and keep the total under [`MAX_BODY_CHARS`].
pub fn wrap_body(marker: &str, body: &str) -> String {
    let head = format!("{}\n", marker);
    let budget = MAX_BODY_CHARS.saturating_sub(head.chars().count());

    if body.chars().count() <= budget {
        return head + body;
    }
    let keep = budget.saturating_sub(TRUNCATION_NOTICE.chars().count());
    let mut out = head;
    out.extend(body.chars().take(keep));
    out.push_str(TRUNCATION_NOTICE);
    out
}

pub fn comments_path(repo: &RepoSlug, number: u64) -> String {
    format!("/repos/{}/{}/issues/{}/comments", repo.owner, repo.name, number)
}

pub fn post(client: &GitHubClient, repo: &RepoSlug, number: u64, body: &str) -> Result<IssueComment> {
    client.send(Method::Post, &comments_path(repo, number), &json!({ "body": body }))
}

/// Edit the newest comment carrying `marker`, or post a new one.
pub fn upsert(
    client: &GitHubClient,
    repo: &RepoSlug,
    number: u64,
    marker: &str,
    body: &str,
) -> Result<IssueComment> {
    let existing = list_all(client, repo, number)?;

    match find_marked(&existing, marker) {
        Some(id) => {
            tracing::info!(comment_id = id, "updating existing comment");
            client.send(
                Method::Patch,
                &format!("/repos/{}/{}/issues/comments/{}", repo.owner, repo.name, id),
                &json!({ "body": body }),
            )
        }
        None => post(client, repo, number, body),
    }
}

/// Every comment on the issue, oldest first. Stops at the first short page.
pub fn list_all(client: &GitHubClient, repo: &RepoSlug, number: u64) -> Result<Vec<IssueComment>> {
    let mut all = Vec::new();
    for page in 1.. {
        let batch: Vec<IssueComment> = client.get(&format!(
            "{}?per_page={}&page={}",
            comments_path(repo, number),
            PAGE_SIZE,
            page
        ))?;
        let done = batch.len() < PAGE_SIZE;
        all.extend(batch);
        if done {
            break;
        }
    }
    tracing::debug!(count = all.len(), "existing comments listed");
    Ok(all)
}

pub fn find_marked(comments: &[IssueComment], marker: &str) -> Option<u64> {
    comments
        .iter()
        .rev()
        .find(|c| c.body.as_deref().is_some_and(|b| b.contains(marker)))
        .map(|c| c.id)
}
