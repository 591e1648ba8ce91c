use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use va_core::{Config, Error, PublishTarget, Publisher, Result};

/// Tag of the single rolling release the slides are attached to.
pub const RELEASE_TAG: &str = "latest-abstract";
const RELEASE_NAME_PREFIX: &str = "JAMA Abstract - ";
const RELEASE_NAME_MAX_CHARS: usize = 70;

static REPOSITORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("valid repository pattern"));

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl GithubConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            timeout: config.publish_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Repository {
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    upload_url: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    browser_download_url: String,
}

/// Publishes files as assets of a `latest-abstract` GitHub release.
///
/// Each upload replaces the previous release so the repository only ever
/// carries the most recent slide.
pub struct GithubReleasePublisher {
    client: Client,
    api_url: String,
}

impl fmt::Debug for GithubReleasePublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubReleasePublisher")
            .field("client", &"<reqwest::Client>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl GithubReleasePublisher {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("va/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Publish(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_url: config.api_url,
        })
    }

    fn validate(target: &PublishTarget) -> Result<()> {
        if !REPOSITORY.is_match(target.repository.trim()) {
            return Err(Error::Publish(format!(
                "Repository must look like 'owner/name', got '{}'",
                target.repository
            )));
        }
        if target.token.trim().is_empty() {
            return Err(Error::Publish("GitHub token is empty".to_string()));
        }
        Ok(())
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", token.trim()))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn repo_url(&self, repo: &str, suffix: &str) -> String {
        format!("{}/repos/{}{}", self.api_url, repo, suffix)
    }

    async fn send(&self, builder: RequestBuilder, token: &str, what: &str) -> Result<Response> {
        self.authed(builder, token).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Publish(format!("Timed out while trying to {}", what))
            } else {
                Error::Publish(format!("Failed to {}: {}", what, e))
            }
        })
    }

    async fn default_branch(&self, repo: &str, token: &str) -> Result<String> {
        let response = self
            .send(self.client.get(self.repo_url(repo, "")), token, "read the repository")
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Publish(format!(
                "Cannot access repository {} (HTTP {}); check the name and token permissions",
                repo, status
            )));
        }
        let repository: Repository = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Unexpected repository response: {}", e)))?;
        Ok(repository.default_branch.unwrap_or_else(|| "main".to_string()))
    }

    /// Removes the previous rolling release together with its assets and tag.
    async fn delete_previous_release(&self, repo: &str, token: &str) -> Result<()> {
        let url = self.repo_url(repo, &format!("/releases/tags/{}", RELEASE_TAG));
        let response = self.send(self.client.get(url), token, "look up the release").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Error::Publish(format!(
                "Failed to look up release {}: HTTP {}",
                RELEASE_TAG,
                response.status()
            )));
        }
        let release: Release = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Unexpected release response: {}", e)))?;

        for asset in &release.assets {
            let url = self.repo_url(repo, &format!("/releases/assets/{}", asset.id));
            self.send(self.client.delete(url), token, "delete an old asset")
                .await?;
        }
        let url = self.repo_url(repo, &format!("/releases/{}", release.id));
        self.send(self.client.delete(url), token, "delete the old release")
            .await?;
        // The tag may already be gone
        let url = self.repo_url(repo, &format!("/git/refs/tags/{}", RELEASE_TAG));
        self.send(self.client.delete(url), token, "delete the old tag")
            .await?;

        debug!("Deleted previous release {} in {}", release.id, repo);
        Ok(())
    }

    async fn create_release(&self, repo: &str, token: &str, name: &str) -> Result<Response> {
        let body = json!({
            "tag_name": RELEASE_TAG,
            "name": release_name(name),
            "body": format!("Visual abstract generated from {}", name),
            "draft": false,
            "prerelease": false,
        });
        self.send(
            self.client.post(self.repo_url(repo, "/releases")).json(&body),
            token,
            "create the release",
        )
        .await
    }

    /// Releases need at least one commit; seed an empty repository with a README.
    async fn initialise_repository(&self, repo: &str, token: &str, branch: &str) -> Result<()> {
        let content = base64::engine::general_purpose::STANDARD
            .encode("# Visual abstracts\n\nSlides published from article pages.\n");
        let body = json!({
            "message": "Initialise repository",
            "content": content,
            "branch": branch,
        });
        let response = self
            .send(
                self.client
                    .put(self.repo_url(repo, "/contents/README.md"))
                    .json(&body),
                token,
                "initialise the repository",
            )
            .await?;
        if !response.status().is_success() {
            return Err(Error::Publish(format!(
                "Failed to initialise empty repository {}: HTTP {}",
                repo,
                response.status()
            )));
        }
        info!("Initialised empty repository {}", repo);
        Ok(())
    }
}

#[async_trait]
impl Publisher for GithubReleasePublisher {
    fn name(&self) -> &str {
        "GitHub release"
    }

    async fn upload(&self, bytes: &[u8], path: &str, target: &PublishTarget) -> Result<String> {
        Self::validate(target)?;
        let repo = target.repository.trim();
        let token = target.token.as_str();
        let file_name = path.rsplit('/').next().unwrap_or(path);

        let branch = self.default_branch(repo, token).await?;
        self.delete_previous_release(repo, token).await?;

        let mut response = self.create_release(repo, token, file_name).await?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let text = response.text().await.unwrap_or_default();
            if !text.contains("Repository is empty") {
                return Err(Error::Publish(format!("Release was rejected: {}", text)));
            }
            self.initialise_repository(repo, token, &branch).await?;
            response = self.create_release(repo, token, file_name).await?;
        }
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "Failed to create release: HTTP {} {}",
                status, text
            )));
        }
        let release: Release = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Unexpected release response: {}", e)))?;

        let upload_url = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url)
            .to_string();
        let response = self
            .send(
                self.client
                    .post(upload_url)
                    .query(&[("name", file_name)])
                    .header("Content-Type", "application/octet-stream")
                    .body(bytes.to_vec()),
                token,
                "upload the file",
            )
            .await?;
        if response.status() != StatusCode::CREATED {
            return Err(Error::Publish(format!(
                "Failed to upload {}: HTTP {}",
                file_name,
                response.status()
            )));
        }
        let asset: UploadedAsset = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Unexpected upload response: {}", e)))?;

        info!("Uploaded {} to {} release of {}", file_name, RELEASE_TAG, repo);
        Ok(asset.browser_download_url)
    }
}

fn release_name(file_name: &str) -> String {
    let stem = file_name
        .strip_suffix(".pptx")
        .unwrap_or(file_name);
    let short: String = stem.chars().take(RELEASE_NAME_MAX_CHARS).collect();
    format!("{}{}", RELEASE_NAME_PREFIX, short)
}
