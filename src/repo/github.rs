use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{RepoHost, repo_name, repo_url};
use crate::config::GitHubConfig;
use crate::errors::RepoError;
use crate::models::{ExistingFile, RepoHandle, Snapshot};

const USER_AGENT: &str = concat!("pagecraft/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github.v3+json";
const REPO_DESCRIPTION: &str = "Static web app generated and published by pagecraft";

/// Body for `POST /user/repos`.
#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

/// One entry of `GET /git/trees/{branch}?recursive=1`.
#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// `GET /contents/{path}` for a file (subset of fields).
#[derive(Debug, Deserialize)]
pub struct ContentsResponse {
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Body for `PUT /contents/{path}`.
#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PagesSource<'a> {
    branch: &'a str,
    path: &'a str,
}

#[derive(Debug, Serialize)]
struct PagesRequest<'a> {
    source: PagesSource<'a>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    sha: String,
}

/// Decode the base64 payload of a contents response.
///
/// GitHub wraps the encoded text at 60 columns, so whitespace is stripped first.
pub fn decode_content(path: &str, encoded: &str) -> Result<String, RepoError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64.decode(compact).map_err(|e| RepoError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| RepoError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// GitHub REST client bound to one account.
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    owner: String,
    api_url: String,
    branch: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, RepoError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            token: config.token.clone(),
            owner: config.owner.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            branch: config.branch.clone(),
        })
    }

    fn repo_endpoint(&self, name: &str, rest: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, name, rest)
    }

    fn contents_endpoint(&self, name: &str, path: &str) -> String {
        self.repo_endpoint(name, &format!("contents/{}", path.trim_start_matches('/')))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
    }

    async fn get_contents(
        &self,
        name: &str,
        path: &str,
    ) -> Result<Option<ContentsResponse>, RepoError> {
        let resp = self
            .request(reqwest::Method::GET, &self.contents_endpoint(name, path))
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(resp.json::<ContentsResponse>().await?))
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    fn owner(&self) -> &str {
        &self.owner
    }

    async fn create_repository(&self, nonce: &str) -> Result<RepoHandle, RepoError> {
        let name = repo_name(nonce);
        let resp = self
            .request(reqwest::Method::POST, &format!("{}/user/repos", self.api_url))
            .json(&CreateRepoRequest {
                name: &name,
                description: REPO_DESCRIPTION,
                private: false,
                auto_init: false,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // A repeated round 1 for the same nonce finds its repository already there.
            if status == StatusCode::UNPROCESSABLE_ENTITY && body.contains("already exists") {
                tracing::warn!(repo = %name, "Repository already exists, reusing it");
            } else {
                return Err(RepoError::CreateFailed {
                    name,
                    status: status.as_u16(),
                    body,
                });
            }
        }

        Ok(RepoHandle {
            url: repo_url(&self.owner, &name),
            name,
        })
    }

    async fn fetch_all_files(&self, name: &str) -> Result<Snapshot, RepoError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &self.repo_endpoint(name, &format!("git/trees/{}", self.branch)),
            )
            .query(&[("recursive", "1")])
            .send()
            .await?;

        let mut snapshot = Snapshot::new();
        if !resp.status().is_success() {
            tracing::debug!(
                repo = name,
                status = %resp.status(),
                "Tree not listable, treating as empty"
            );
            return Ok(snapshot);
        }
        let tree: TreeResponse = resp.json().await?;
        if tree.truncated {
            tracing::warn!(repo = name, "Tree listing was truncated by GitHub");
        }

        for entry in tree.tree.into_iter().filter(|e| e.kind == "blob") {
            let Some(contents) = self.get_contents(name, &entry.path).await? else {
                tracing::warn!(repo = name, path = %entry.path, "Listed file could not be read");
                continue;
            };
            let content = match contents.content.as_deref() {
                Some(encoded) if !encoded.is_empty() => match decode_content(&entry.path, encoded) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(repo = name, error = %e, "Skipping non-text file");
                        continue;
                    }
                },
                _ => String::new(),
            };
            snapshot.insert(
                entry.path,
                ExistingFile {
                    content,
                    revision: contents.sha,
                },
            );
        }

        Ok(snapshot)
    }

    async fn file_revision(&self, name: &str, path: &str) -> Result<Option<String>, RepoError> {
        Ok(self.get_contents(name, path).await?.map(|c| c.sha))
    }

    async fn upsert_file(
        &self,
        name: &str,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> Result<(), RepoError> {
        let body = PutContentsRequest {
            message: format!("Update file: {}", path),
            content: BASE64.encode(content.as_bytes()),
            branch: &self.branch,
            sha: revision,
        };
        let resp = self
            .request(reqwest::Method::PUT, &self.contents_endpoint(name, path))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }
        Err(RepoError::UpsertFailed {
            path: path.to_string(),
            status: status.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        })
    }

    async fn latest_commit(&self, name: &str) -> Result<String, RepoError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                &self.repo_endpoint(name, &format!("commits/{}", self.branch)),
            )
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RepoError::CommitLookupFailed {
                name: name.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<CommitResponse>().await?.sha)
    }

    async fn enable_static_hosting(&self, name: &str) -> Result<(), RepoError> {
        let resp = self
            .request(reqwest::Method::POST, &self.repo_endpoint(name, "pages"))
            .json(&PagesRequest {
                source: PagesSource {
                    branch: &self.branch,
                    path: "/",
                },
            })
            .send()
            .await?;

        match resp.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => {
                tracing::debug!(repo = name, "GitHub Pages already enabled");
                Ok(())
            }
            status => Err(RepoError::HostingFailed {
                name: name.to_string(),
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}
