use super::{ApiResult, Client, RepoRef};
use crate::Result;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "      tree";

/// Pause between attempts on successive branches
const BRANCH_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// The file listing of a repository at a specific branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTree {
    /// Branch the listing was taken from
    pub branch: String,

    /// Paths of every file (blob) in the tree, in listing order
    pub paths: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

fn build_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).into_app_err_with(|| format!("invalid base URL '{base}'"))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| app_err!("base URL '{base}' cannot carry a path"))?;
        let _ = path.pop_if_empty();
        let _ = path.extend(segments);
    }
    Ok(url)
}

/// Fetch the recursive file tree of a repository.
///
/// Branches configured in the client settings are tried in order; the first that
/// responds successfully wins. Returns `None` when no branch yields a tree.
pub async fn fetch_tree(client: &Client, repo: &RepoRef) -> Option<RepoTree> {
    let branches = &client.settings().branches;

    for (i, branch) in branches.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(BRANCH_RETRY_PAUSE).await;
        }

        match fetch_tree_at(client, repo, branch).await {
            Ok(Some(tree)) => return Some(tree),
            Ok(None) => log::debug!(target: LOG_TARGET, "{repo}: no branch '{branch}'"),
            Err(e) => log::debug!(target: LOG_TARGET, "{repo}: could not list tree at '{branch}': {e:#}"),
        }
    }

    log::debug!(target: LOG_TARGET, "{repo}: no tree found on any of {branches:?}");
    None
}

async fn fetch_tree_at(client: &Client, repo: &RepoRef, branch: &str) -> Result<Option<RepoTree>> {
    let mut url = build_url(
        &client.settings().api_url,
        &["repos", &repo.owner, &repo.name, "git", "trees", branch],
    )?;
    let _ = url.query_pairs_mut().append_pair("recursive", "1");

    let what = format!("listing tree of {repo}");
    let resp = match client.get(&what, url.as_str()).await {
        ApiResult::Success(resp) => resp,
        ApiResult::NotFound => return Ok(None),
        other => return other.into_result(&what).map(|_| None),
    };

    let body: TreeResponse = resp.json().await.into_app_err_with(|| format!("decoding tree of {repo}"))?;
    if body.truncated {
        log::warn!(target: LOG_TARGET, "{repo}: tree listing was truncated by the API");
    }

    Ok(Some(RepoTree {
        branch: branch.to_string(),
        paths: body.tree.into_iter().filter(|e| e.kind == "blob").map(|e| e.path).collect(),
    }))
}

/// Fetch the raw contents of a file at a given branch.
pub async fn fetch_raw(client: &Client, repo: &RepoRef, branch: &str, path: &str) -> Result<String> {
    let mut segments = vec![repo.owner.as_str(), repo.name.as_str(), branch];
    segments.extend(path.split('/').filter(|s| !s.is_empty()));
    let url = build_url(&client.settings().raw_url, &segments)?;

    let what = format!("fetching {path} from {repo}");
    let resp = client.get(&what, url.as_str()).await.into_result(&what)?;
    resp.text().await.into_app_err_with(|| format!("reading {path} from {repo}"))
}
