use super::{Client, RepoRef};
use crate::Result;
use chrono::{DateTime, Utc};
use ohno::app_err;
use serde::Deserialize;
use serde_json::json;

const CREATED_AT_QUERY: &str = r"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    createdAt
  }
}";

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    created_at: DateTime<Utc>,
}

/// Look up when a repository was created.
pub async fn fetch_created_at(client: &Client, repo: &RepoRef) -> Result<DateTime<Utc>> {
    let what = format!("looking up {repo}");
    let data: RepositoryData = client
        .graphql(&what, CREATED_AT_QUERY, json!({ "owner": repo.owner, "name": repo.name }))
        .await?;

    data.repository
        .map(|r| r.created_at)
        .ok_or_else(|| app_err!("repository {repo} does not exist or is not visible"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_data_decodes_timestamp() {
        let json = r#"{ "repository": { "createdAt": "2019-03-04T10:20:30Z" } }"#;
        let data: RepositoryData = serde_json::from_str(json).unwrap();
        let created = data.repository.unwrap().created_at;
        assert_eq!(created.to_rfc3339(), "2019-03-04T10:20:30+00:00");
    }

    #[test]
    fn test_missing_repository_decodes_to_none() {
        let data: RepositoryData = serde_json::from_str(r#"{ "repository": null }"#).unwrap();
        assert!(data.repository.is_none());
    }
}
