use super::Client;
use crate::Result;
use core::fmt::{Display, Formatter};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;

const LOG_TARGET: &str = "    search";

/// Maximum page size the search API allows
const PAGE_SIZE: u32 = 100;

const SEARCH_QUERY: &str = r"
query($q: String!, $first: Int!, $after: String) {
  search(query: $q, type: REPOSITORY, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on Repository {
        name
        owner { login }
        stargazerCount
      }
    }
  }
}";

/// Identity of a repository on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Identity of `owner/name`.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl Display for RepoRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A repository returned by a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredRepo {
    pub owner: String,
    pub name: String,
    pub stars: u64,
}

impl DiscoveredRepo {
    #[must_use]
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.name)
    }
}

/// The result of paginating one search expression.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Every repository seen, in page order
    pub repos: Vec<DiscoveredRepo>,

    /// The last cursor reported by the API
    pub end_cursor: Option<String>,

    /// `false` when a page fetch failed before the API reported the last page
    pub complete: bool,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<SearchNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNode {
    name: Option<String>,
    owner: Option<Owner>,
    #[serde(default)]
    stargazer_count: u64,
}

#[derive(Debug, Deserialize)]
struct Owner {
    login: String,
}

impl SearchNode {
    fn into_repo(self) -> Option<DiscoveredRepo> {
        Some(DiscoveredRepo {
            owner: self.owner?.login,
            name: self.name?,
            stars: self.stargazer_count,
        })
    }
}

/// Paginate a repository search expression.
///
/// Starts at `start_cursor` (or the first page) and follows cursors until the API
/// reports no further pages or a query fails. `on_page` is called after every
/// successful page with that page's repositories and the cursor that resumes after
/// it; an error from the callback aborts pagination and is returned.
pub async fn search_repositories<F>(
    client: &Client,
    expression: &str,
    start_cursor: Option<String>,
    page_delay: Duration,
    mut on_page: F,
) -> Result<SearchOutcome>
where
    F: FnMut(&[DiscoveredRepo], Option<&str>) -> Result<()>,
{
    let mut outcome = SearchOutcome {
        end_cursor: start_cursor,
        ..SearchOutcome::default()
    };
    let mut page = 0_usize;

    loop {
        let variables = json!({
            "q": expression,
            "first": PAGE_SIZE,
            "after": outcome.end_cursor,
        });

        let data: SearchData = match client.graphql("searching repositories", SEARCH_QUERY, variables).await {
            Ok(data) => data,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Query '{expression}' failed on page {}: {e:#}", page + 1);
                return Ok(outcome);
            }
        };

        page += 1;
        let connection = data.search;
        let repos: Vec<_> = connection.nodes.into_iter().flatten().filter_map(SearchNode::into_repo).collect();

        if connection.page_info.end_cursor.is_some() {
            outcome.end_cursor = connection.page_info.end_cursor;
        }

        log::debug!(target: LOG_TARGET, "Query '{expression}' page {page}: {} repositories", repos.len());
        on_page(&repos, outcome.end_cursor.as_deref())?;
        outcome.repos.extend(repos);

        if !connection.page_info.has_next_page {
            outcome.complete = true;
            return Ok(outcome);
        }

        tokio::time::sleep(page_delay).await;
    }
}
