use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::models::RepoTarget;
use crate::errors::GitHubError;

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "macc";

/// Publishes generated code to a hosted repository.
/// Real implementation: `GitHubClient`. Test double: `RecordingPublisher` in api tests.
#[async_trait]
pub trait CodePublisher: Send + Sync {
    /// Create the repository if needed, write `filename` (and `README.md` when
    /// given), and return the browsable URL of the pushed file.
    async fn push(
        &self,
        target: &RepoTarget,
        code: &str,
        filename: &str,
        readme: Option<&str>,
    ) -> Result<String, GitHubError>;
}

/// A GitHub repository (subset of fields we care about).
#[derive(Debug, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    pub name: String,
    pub private: bool,
    pub html_url: String,
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    auto_init: bool,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContentBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Validate that a string looks like a GitHub token based on its prefix.
///
/// Format check only; it does not verify the token is active or has the
/// `repo` scope. Used to warn at startup before the first commit fails.
pub fn is_valid_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    GITHUB_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Parse the `owner/repo` slug from a GitHub URL.
///
/// Handles `https://github.com/owner/repo`, a trailing `.git`, a trailing
/// slash, and `/blob/...` links as returned by a commit.
pub fn parse_owner_repo_from_url(url: &str) -> Option<String> {
    let rest = url.trim().strip_prefix("https://")?;
    let repo_path = rest.strip_prefix("github.com/")?;
    let repo_path = repo_path.trim_end_matches('/');

    let mut parts = repo_path.splitn(3, '/');
    let owner = parts.next()?;
    let name = parts.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    if let Some(tail) = parts.next()
        && !tail.starts_with("blob/")
        && !tail.starts_with("tree/")
    {
        return None;
    }
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}

/// Browsable URL of a file on a branch.
pub fn blob_url(owner: &str, name: &str, branch: &str, filename: &str) -> String {
    format!("https://github.com/{}/{}/blob/{}/{}", owner, name, branch, filename)
}

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubClient {
    pub fn new(token: &str) -> Self {
        Self::with_api_base(token, GITHUB_API_URL)
    }

    pub fn with_api_base(token: &str, api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<Option<reqwest::Response>, GitHubError> {
        let resp = builder.send().await.map_err(GitHubError::Network)?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GitHubError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(resp))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        resp: reqwest::Response,
    ) -> Result<T, GitHubError> {
        resp.json::<T>()
            .await
            .map_err(|e| GitHubError::Other(anyhow::anyhow!("Failed to parse {} response: {}", endpoint, e)))
    }

    /// Login of the user that owns the token.
    pub async fn authenticated_login(&self) -> Result<String, GitHubError> {
        let endpoint = "/user";
        let resp = self
            .send(endpoint, self.request(reqwest::Method::GET, endpoint))
            .await?
            .ok_or_else(|| GitHubError::Api {
                endpoint: endpoint.to_string(),
                status: 404,
                body: "authenticated user not found".to_string(),
            })?;
        let user: GitHubUser = self.json(endpoint, resp).await?;
        Ok(user.login)
    }

    pub async fn get_repo(&self, owner: &str, name: &str) -> Result<Option<GitHubRepo>, GitHubError> {
        let endpoint = format!("/repos/{}/{}", owner, name);
        match self
            .send(&endpoint, self.request(reqwest::Method::GET, &endpoint))
            .await?
        {
            Some(resp) => Ok(Some(self.json(&endpoint, resp).await?)),
            None => Ok(None),
        }
    }

    /// Create a repository initialised with a first commit so the default
    /// branch exists before files are written.
    pub async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        owner_is_user: bool,
    ) -> Result<GitHubRepo, GitHubError> {
        let endpoint = if owner_is_user {
            "/user/repos".to_string()
        } else {
            format!("/orgs/{}/repos", owner)
        };
        let body = CreateRepoBody {
            name,
            auto_init: true,
            description: "Generated by MACC - Multi-Agent Code Collaborator",
        };
        let resp = self
            .send(
                &endpoint,
                self.request(reqwest::Method::POST, &endpoint).json(&body),
            )
            .await?
            .ok_or_else(|| GitHubError::Api {
                endpoint: endpoint.clone(),
                status: 404,
                body: format!("cannot create repositories under '{}'", owner),
            })?;
        self.json(&endpoint, resp).await
    }

    /// Blob SHA of an existing file, or `None` when it does not exist yet.
    pub async fn file_sha(
        &self,
        owner: &str,
        name: &str,
        path: &str,
    ) -> Result<Option<String>, GitHubError> {
        let endpoint = format!("/repos/{}/{}/contents/{}", owner, name, path);
        match self
            .send(&endpoint, self.request(reqwest::Method::GET, &endpoint))
            .await?
        {
            Some(resp) => {
                let entry: ContentEntry = self.json(&endpoint, resp).await?;
                Ok(Some(entry.sha))
            }
            None => Ok(None),
        }
    }

    /// Create or update one file. `what` names the file in the commit message
    /// ("main code" → "Add main code" / "Update main code").
    pub async fn put_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        content: &str,
        what: &str,
    ) -> Result<(), GitHubError> {
        let sha = self.file_sha(owner, name, path).await?;
        let message = match sha {
            Some(_) => format!("Update {}", what),
            None => format!("Add {}", what),
        };
        let endpoint = format!("/repos/{}/{}/contents/{}", owner, name, path);
        let body = PutContentBody {
            message: &message,
            content: BASE64.encode(content.as_bytes()),
            sha: sha.as_deref(),
        };
        self.send(
            &endpoint,
            self.request(reqwest::Method::PUT, &endpoint).json(&body),
        )
        .await?
        .ok_or_else(|| GitHubError::Api {
            endpoint: endpoint.clone(),
            status: 404,
            body: "repository not found while writing file".to_string(),
        })?;
        tracing::info!(repo = %format!("{}/{}", owner, name), path, "{}", message);
        Ok(())
    }
}

#[async_trait]
impl CodePublisher for GitHubClient {
    async fn push(
        &self,
        target: &RepoTarget,
        code: &str,
        filename: &str,
        readme: Option<&str>,
    ) -> Result<String, GitHubError> {
        if target.name.trim().is_empty() {
            return Err(GitHubError::EmptyRepoName);
        }
        let login = self.authenticated_login().await?;
        let owner = target.owner.clone().unwrap_or_else(|| login.clone());
        let owner_is_user = owner.eq_ignore_ascii_case(&login);

        let repo = match self.get_repo(&owner, &target.name).await? {
            Some(repo) => repo,
            None => {
                tracing::info!(owner = %owner, name = %target.name, "Creating repository");
                self.create_repo(&owner, &target.name, owner_is_user).await?
            }
        };

        self.put_file(&owner, &target.name, filename, code, "main code")
            .await?;

        if let Some(readme) = readme.filter(|r| !r.trim().is_empty())
            && let Err(e) = self
                .put_file(&owner, &target.name, "README.md", readme, "README")
                .await
        {
            tracing::warn!(error = %e, "README push failed; code was pushed");
        }

        Ok(blob_url(&owner, &target.name, &repo.default_branch, filename))
    }
}
