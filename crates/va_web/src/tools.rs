//! The two tools the server exposes and their argument handling.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use va_core::{ArticleRecord, Error, PublishTarget, RenderRequest, Result};

use crate::rpc::{CallToolResult, McpTool};
use crate::state::AppState;

pub const SCRAPE_JAMA_ARTICLE: &str = "scrape_jama_article";
pub const CREATE_POWERPOINT: &str = "create_powerpoint";

#[derive(Debug, Deserialize)]
struct ScrapeArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CreatePowerpointArgs {
    data: ArticleRecord,
    #[serde(default)]
    output_filename: Option<String>,
    #[serde(default)]
    github_repo: Option<String>,
    #[serde(default)]
    github_token: Option<String>,
}

pub fn list_tools() -> Vec<McpTool> {
    vec![
        McpTool {
            name: SCRAPE_JAMA_ARTICLE.to_string(),
            description: Some(
                "Extract title, authors, abstract sections, key points, figure and citation from a JAMA Network article page"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "https://jamanetwork.com/journals/... article URL"
                    }
                },
                "required": ["url"]
            }),
        },
        McpTool {
            name: CREATE_POWERPOINT.to_string(),
            description: Some(
                "Render an article record into a one-slide visual abstract, optionally publishing it as a GitHub release asset"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "object",
                        "description": "Article record as returned by scrape_jama_article",
                        "required": ["title"]
                    },
                    "output_filename": { "type": "string", "default": va_core::DEFAULT_OUTPUT_FILENAME },
                    "github_repo": { "type": "string", "description": "owner/name" },
                    "github_token": { "type": "string" }
                },
                "required": ["data"]
            }),
        },
    ]
}

/// Runs a tool. `None` means the tool does not exist.
pub async fn call_tool(state: &AppState, name: &str, arguments: Value) -> Option<CallToolResult> {
    let outcome = match name {
        SCRAPE_JAMA_ARTICLE => scrape(state, arguments).await,
        CREATE_POWERPOINT => create_powerpoint(state, arguments).await,
        _ => return None,
    };

    Some(match outcome {
        Ok(result) => result,
        Err(e) => {
            warn!(tool = %name, error = %e, "Tool failed");
            let report = e.to_report();
            let message = report.message.clone();
            CallToolResult::error(message, json!(report))
        }
    })
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| Error::InvalidInput(format!("Invalid arguments for {}: {}", tool, e)))
}

async fn scrape(state: &AppState, arguments: Value) -> Result<CallToolResult> {
    let args: ScrapeArgs = parse_args(SCRAPE_JAMA_ARTICLE, arguments)?;
    let outcome = va_scrapers::extract(args.url.trim(), &state.fetcher).await?;

    let mut message = format!("Successfully scraped article: {}", outcome.value.title);
    if let Some(summary) = outcome.warning_summary() {
        message.push_str(&format!(" (warnings: {})", summary));
    }
    info!("{}", message);

    Ok(CallToolResult::ok(
        message.clone(),
        json!({
            "result": message,
            "data": outcome.value,
            "warnings": outcome.warnings,
        }),
    ))
}

async fn create_powerpoint(state: &AppState, arguments: Value) -> Result<CallToolResult> {
    let args: CreatePowerpointArgs = parse_args(CREATE_POWERPOINT, arguments)?;
    let publish = publish_target(args.github_repo, args.github_token)?;

    let request = RenderRequest::new(args.data)
        .with_output_filename(args.output_filename)
        .with_publish(publish);
    let outcome = state.composer().compose(request).await?;

    let mut message = format!("PowerPoint created at {}", outcome.value.output_path);
    if let Some(url) = &outcome.value.download_url {
        message.push_str(&format!(" and uploaded to {}", url));
    }
    if let Some(summary) = outcome.warning_summary() {
        message.push_str(&format!(" (warnings: {})", summary));
    }
    info!("{}", message);

    let mut payload = json!({
        "result": message,
        "output_path": outcome.value.output_path,
        "warnings": outcome.warnings,
    });
    if let Some(url) = &outcome.value.download_url {
        payload["download_url"] = json!(url);
    }
    Ok(CallToolResult::ok(message, payload))
}

fn publish_target(repo: Option<String>, token: Option<String>) -> Result<Option<PublishTarget>> {
    let repo = repo.filter(|r| !r.trim().is_empty());
    let token = token.filter(|t| !t.trim().is_empty());
    match (repo, token) {
        (Some(repository), Some(token)) => Ok(Some(PublishTarget { repository, token })),
        (None, None) => Ok(None),
        _ => Err(Error::InvalidInput(
            "github_repo and github_token must be given together".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tools_schemas() {
        let tools = list_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SCRAPE_JAMA_ARTICLE, CREATE_POWERPOINT]);
        assert_eq!(tools[0].input_schema["required"], json!(["url"]));
        assert_eq!(tools[1].input_schema["required"], json!(["data"]));
    }

    #[test]
    fn test_publish_target_pairs() {
        assert_eq!(publish_target(None, None).unwrap(), None);
        assert_eq!(publish_target(Some(" ".into()), None).unwrap(), None);
        assert!(publish_target(Some("o/r".into()), Some("t".into()))
            .unwrap()
            .is_some());
        let err = publish_target(Some("o/r".into()), None).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_bad_arguments_are_validation_errors() {
        let err = parse_args::<ScrapeArgs>(SCRAPE_JAMA_ARTICLE, json!({"link": "x"})).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        let err = parse_args::<CreatePowerpointArgs>(CREATE_POWERPOINT, json!({"data": {"authors": []}}))
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_scraped_record_renders() {
        let page = r#"<html><head>
  <meta name="citation_journal_title" content="JAMA">
</head><body>
  <h1 class="meta-article-title">Statins and Memory</h1>
  <div id="abstract">
    <p><strong>Objective</strong> To test memory.</p>
    <p><strong>Results</strong> No change was observed.</p>
  </div>
  <div class="key-points"><p>Question: Do statins affect memory?</p></div>
</body></html>"#;
        let scraped = va_scrapers::JamaScraper::parse_document(
            page,
            "https://jamanetwork.com/journals/jama/fullarticle/9",
        )
        .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let config = va_core::Config {
            output_dir: dir.path().to_path_buf(),
            ..va_core::Config::default()
        };
        let state = AppState::new(config, va_publish::PublisherKind::Memory).unwrap();
        let outcome = state
            .composer()
            .compose(RenderRequest::new(scraped.value))
            .await
            .unwrap();
        assert!(std::path::Path::new(&outcome.value.output_path).exists());
        assert!(outcome.value.download_url.is_none());
    }
}
