//! GitHub API Example
//!
//! Demonstrates conduit's interceptors, shorthand methods and cancellation.

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::time::Duration;

use conduit::prelude::*;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Data Types
// ============================================================================

/// A GitHub contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
}

/// A GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stargazers_count: u32,
    pub forks_count: u32,
}

/// Request to create a GitHub issue.
#[derive(Debug, Clone, Serialize)]
pub struct CreateIssue {
    pub title: String,
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// A GitHub issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u32,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
}

// ============================================================================
// API wrapper
// ============================================================================

/// Thin typed wrapper over a conduit [`Client`].
#[derive(Debug, Clone)]
pub struct GitHubApi {
    client: Client,
}

impl GitHubApi {
    /// Create a client for `base_url`, optionally authenticated with `token`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = conduit::create(
            RequestConfig::new()
                .base_url(base_url)
                .common_header("Accept", "application/vnd.github+json")
                .common_header("User-Agent", "conduit-github-example/0.1.0")
                .timeout(Duration::from_secs(10)),
        );

        if let Some(token) = token {
            client
                .interceptors()
                .request
                .add(Interceptor::fulfilled(move |config: RequestConfig| {
                    let authorization = format!("Bearer {token}");
                    async move { Ok(config.header("Authorization", authorization)) }
                }));
        }

        client
            .interceptors()
            .response
            .add(Interceptor::fulfilled(|response: Response| async move {
                if let Some(remaining) = response.header("x-ratelimit-remaining") {
                    tracing::debug!(remaining, "rate limit");
                }
                Ok(response)
            }));

        Self { client }
    }

    /// List contributors for a repository.
    pub async fn contributors(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        self.client
            .get(format!("/repos/{owner}/{repo}/contributors"), RequestConfig::new())
            .await?
            .json()
    }

    /// Get repository information.
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.client
            .get(format!("/repos/{owner}/{repo}"), RequestConfig::new())
            .await?
            .json()
    }

    /// List issues with optional query parameters.
    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: Option<&str>,
        per_page: Option<u32>,
        cancel: Option<CancelToken>,
    ) -> Result<Vec<Issue>> {
        let mut config = RequestConfig::new();
        if let Some(state) = state {
            config = config.param("state", state);
        }
        if let Some(per_page) = per_page {
            config = config.param("per_page", per_page);
        }
        if let Some(token) = cancel {
            config = config.cancel_token(token);
        }

        self.client
            .get(format!("/repos/{owner}/{repo}/issues"), config)
            .await?
            .json()
    }

    /// Create an issue.
    pub async fn create_issue(&self, owner: &str, repo: &str, issue: &CreateIssue) -> Result<Issue> {
        self.client
            .post(
                format!("/repos/{owner}/{repo}/issues"),
                Body::json(issue)?,
                RequestConfig::new(),
            )
            .await?
            .json()
    }
}

// ============================================================================
// Main: Demonstrate usage
// ============================================================================

#[tokio::main]
async fn main() -> conduit::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let github = GitHubApi::new("https://api.github.com", std::env::var("GITHUB_TOKEN").ok());

    let repo = github.get_repo("rust-lang", "rust").await?;
    println!("{}: {} stars", repo.full_name, repo.stargazers_count);

    // A request that gives up as soon as the caller does.
    let source = CancelToken::source();
    let pending = tokio::spawn({
        let github = github.clone();
        let token = source.token.clone();
        async move {
            github
                .list_issues("rust-lang", "rust", Some("open"), Some(100), Some(token))
                .await
        }
    });
    source.cancel.cancel("demo finished");

    match pending.await {
        Ok(Err(err)) if err.is_cancel() => println!("listing cancelled: {err}"),
        Ok(Ok(issues)) => println!("{} open issues", issues.len()),
        Ok(Err(err)) => return Err(err),
        Err(join) => println!("listing task failed: {join}"),
    }

    Ok(())
}

// ============================================================================
// Tests using wiremock
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    #[tokio::test]
    async fn test_contributors() {
        let mock_server = MockServer::start().await;

        let contributors = vec![
            Contributor {
                login: "user1".to_string(),
                contributions: 100,
            },
            Contributor {
                login: "user2".to_string(),
                contributions: 50,
            },
        ];

        Mock::given(method("GET"))
            .and(path("/repos/rust-lang/rust/contributors"))
            .and(header("Accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&contributors))
            .mount(&mock_server)
            .await;

        let github = GitHubApi::new(mock_server.uri(), None);
        let result = github
            .contributors("rust-lang", "rust")
            .await
            .expect("contributors");

        assert_eq!(result.len(), 2);
        let first = result.first().expect("first contributor");
        assert_eq!(first.login, "user1");
        assert_eq!(first.contributions, 100);
    }

    #[tokio::test]
    async fn test_get_repo_with_token() {
        let mock_server = MockServer::start().await;

        let repo = Repository {
            id: 12345,
            name: "rust".to_string(),
            full_name: "rust-lang/rust".to_string(),
            description: Some("The Rust programming language".to_string()),
            stargazers_count: 90000,
            forks_count: 12000,
        };

        Mock::given(method("GET"))
            .and(path("/repos/rust-lang/rust"))
            .and(header("Authorization", "Bearer s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&repo))
            .mount(&mock_server)
            .await;

        let github = GitHubApi::new(mock_server.uri(), Some("s3cr3t".to_string()));
        let result = github.get_repo("rust-lang", "rust").await.expect("repo");

        assert_eq!(result, repo);
    }

    #[tokio::test]
    async fn test_list_issues_with_query_params() {
        let mock_server = MockServer::start().await;

        let issues = vec![Issue {
            id: 1,
            number: 42,
            title: "Example issue".to_string(),
            body: Some("Issue body".to_string()),
            state: "open".to_string(),
        }];

        Mock::given(method("GET"))
            .and(path("/repos/rust-lang/rust/issues"))
            .and(query_param("state", "open"))
            .and(query_param("per_page", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&issues))
            .mount(&mock_server)
            .await;

        let github = GitHubApi::new(mock_server.uri(), None);
        let result = github
            .list_issues("rust-lang", "rust", Some("open"), Some(5), None)
            .await
            .expect("issues");

        assert_eq!(result.first().expect("first issue").number, 42);
    }

    #[tokio::test]
    async fn test_list_issues_cancelled() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let source = CancelToken::source();
        source.cancel.cancel("stop");

        let github = GitHubApi::new(mock_server.uri(), None);
        let err = github
            .list_issues("rust-lang", "rust", None, None, Some(source.token))
            .await
            .expect_err("cancelled");

        assert!(is_cancel(&err));
    }

    #[tokio::test]
    async fn test_create_issue() {
        let mock_server = MockServer::start().await;

        let input = CreateIssue {
            title: "Bug".to_string(),
            body: None,
            labels: vec!["bug".to_string()],
        };

        Mock::given(method("POST"))
            .and(path("/repos/owner/repo/issues"))
            .and(body_json(serde_json::json!({"title": "Bug", "body": null, "labels": ["bug"]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 7,
                "number": 1,
                "title": "Bug",
                "body": null,
                "state": "open"
            })))
            .mount(&mock_server)
            .await;

        let github = GitHubApi::new(mock_server.uri(), None);
        let issue = github
            .create_issue("owner", "repo", &input)
            .await
            .expect("issue");

        assert_eq!(issue.number, 1);
        assert_eq!(issue.state, "open");
    }
}
