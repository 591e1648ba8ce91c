use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TEMPLATE_PATH: &str = "templates/abstract.pptx";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Process configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub http_timeout: Duration,
    pub publish_timeout: Duration,
    pub bind_addr: String,
    pub github_api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            http_timeout: Duration::from_secs(25),
            publish_timeout: Duration::from_secs(60),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            template_path: lookup("JAMA_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            http_timeout: secs("VA_HTTP_TIMEOUT_SECS", defaults.http_timeout),
            publish_timeout: secs("VA_PUBLISH_TIMEOUT_SECS", defaults.publish_timeout),
            bind_addr: lookup("VA_BIND_ADDR").unwrap_or(defaults.bind_addr),
            github_api_url: lookup("GITHUB_API_URL").unwrap_or(defaults.github_api_url),
        }
    }

    pub fn uses_default_template(&self) -> bool {
        self.template_path == PathBuf::from(DEFAULT_TEMPLATE_PATH)
    }
}
