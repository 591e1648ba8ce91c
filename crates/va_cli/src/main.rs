use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use va_composer::SlideComposer;
use va_core::logging::init_logging;
use va_core::{ArticleRecord, Config, Diagnosed, Fetcher, PublishTarget, RenderRequest, RenderResult};
use va_publish::{create_publisher, PublisherKind};
use va_scrapers::{handle_command, ScraperArgs};
use va_web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "JAMA article to visual abstract slide", long_about = None)]
pub struct Cli {
    /// PPTX template; the built-in layout is used when the default path is missing
    #[arg(long, global = true, env = "JAMA_TEMPLATE")]
    template: Option<PathBuf>,
    /// Directory for generated decks
    #[arg(long, global = true, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = PublisherKind::Github)]
    publisher: PublisherKind,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape article pages into JSON records
    Scrape(ScraperArgs),
    /// Render a JSON record into a slide deck
    Render {
        /// Record produced by `scrape url`
        #[arg(long = "va", default_value = "va.json")]
        record: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Scrape an article and render it in one step
    Generate {
        url: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the JSON-RPC tool server
    Serve {
        #[arg(long, env = "VA_BIND_ADDR")]
        addr: Option<String>,
    },
    /// Write the built-in template so it can be edited
    Template {
        #[arg(short, long, default_value = "abstract.pptx")]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// File name inside the output directory
    #[arg(short, long)]
    out: Option<String>,
    /// owner/name repository to publish the deck to
    #[arg(long, requires = "github_token")]
    github_repo: Option<String>,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
}

impl OutputArgs {
    fn publish_target(&self) -> Option<PublishTarget> {
        match (&self.github_repo, &self.github_token) {
            (Some(repository), Some(token)) => Some(PublishTarget {
                repository: repository.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(template) = &self.template {
            config.template_path = template.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config
    }
}

async fn compose(
    config: &Config,
    fetcher: Fetcher,
    kind: PublisherKind,
    record: ArticleRecord,
    output: OutputArgs,
) -> anyhow::Result<Diagnosed<RenderResult>> {
    let publish = output.publish_target();
    let mut composer = SlideComposer::from_config(config, fetcher);
    if publish.is_some() {
        composer = composer.with_publisher(create_publisher(kind, config)?);
    }
    let request = RenderRequest::new(record)
        .with_output_filename(output.out)
        .with_publish(publish);
    Ok(composer.compose(request).await?)
}

fn report(outcome: &Diagnosed<RenderResult>) {
    println!("🖼️  {}", outcome.value.output_path);
    if let Some(url) = &outcome.value.download_url {
        println!("🔗 {}", url);
    }
    for warning in &outcome.warnings {
        println!("⚠️  {}", warning);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = cli.config();
    let fetcher = Fetcher::new(config.http_timeout)?;

    match cli.command {
        Commands::Scrape(args) => handle_command(args, &fetcher).await?,
        Commands::Render { record, output } => {
            let json = tokio::fs::read_to_string(&record)
                .await
                .with_context(|| format!("reading {}", record.display()))?;
            let record: ArticleRecord = serde_json::from_str(&json)
                .with_context(|| format!("parsing {}", record.display()))?;
            let outcome = compose(&config, fetcher, cli.publisher, record, output).await?;
            report(&outcome);
        }
        Commands::Generate { url, output } => {
            info!("🦗 Scraping {}", url);
            let scraped = va_scrapers::extract(&url, &fetcher).await?;
            for warning in &scraped.warnings {
                println!("⚠️  {}", warning);
            }
            let outcome = compose(&config, fetcher, cli.publisher, scraped.value, output).await?;
            report(&outcome);
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            let state = AppState::new(config, cli.publisher)?;
            va_web::serve(&addr, state).await?;
        }
        Commands::Template { out } => {
            let bytes = va_composer::builtin::template_bytes()?;
            tokio::fs::write(&out, bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("📄 {}", out.display());
        }
    }

    Ok(())
}
