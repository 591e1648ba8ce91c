use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info};
use va_core::{
    ArticleRecord, Config, Diagnosed, Error, Fetcher, PublishTarget, Publisher, RenderRequest,
    RenderResult, Result, WarningKind, WarningSink,
};

use crate::figure;
use crate::layout::{plan_text, regions};
use crate::package::{rels_path_for, REL_TYPE_IMAGE};
use crate::slide::{fill_slide, PictureFill, SlideFill};
use crate::template::Template;

/// Where templates come from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    File(PathBuf),
    Builtin,
}

impl TemplateSource {
    /// The configured file, or the built-in template when the default path is unset on disk.
    pub fn from_config(config: &Config) -> Self {
        if config.uses_default_template() && !config.template_path.exists() {
            info!(
                "No template at {}, using the built-in layout",
                config.template_path.display()
            );
            TemplateSource::Builtin
        } else {
            TemplateSource::File(config.template_path.clone())
        }
    }

    pub fn load(&self) -> Result<Template> {
        match self {
            TemplateSource::File(path) => Template::open(path),
            TemplateSource::Builtin => Template::builtin(),
        }
    }
}

/// Renders article records into single-slide presentations.
pub struct SlideComposer {
    template: TemplateSource,
    output_dir: PathBuf,
    fetcher: Fetcher,
    publisher: Option<Arc<dyn Publisher>>,
    publish_timeout: Duration,
}

impl SlideComposer {
    pub fn new(template: TemplateSource, output_dir: impl Into<PathBuf>, fetcher: Fetcher) -> Self {
        Self {
            template,
            output_dir: output_dir.into(),
            fetcher,
            publisher: None,
            publish_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &Config, fetcher: Fetcher) -> Self {
        Self::new(
            TemplateSource::from_config(config),
            config.output_dir.clone(),
            fetcher,
        )
        .with_publish_timeout(config.publish_timeout)
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Fills the template with `request.record`, writes it under the output
    /// directory and, when asked, hands the file to the publisher.
    pub async fn compose(&self, request: RenderRequest) -> Result<Diagnosed<RenderResult>> {
        let RenderRequest {
            record,
            output_filename,
            publish,
        } = request;

        if record.title.trim().is_empty() {
            return Err(Error::Render("Article title is empty".to_string()));
        }
        let filename = output_file_name(&output_filename)?;

        let template = self.template.load()?;
        let mut sink = WarningSink::new();
        let figure = self.figure_bytes(&record, &template, &mut sink).await;

        let output_dir = self.output_dir.clone();
        let target_name = filename.clone();
        let (rendered, sink) = tokio::task::spawn_blocking(move || {
            let rendered = render(template, &record, figure, &mut sink)
                .and_then(|bytes| write_output(&output_dir, &target_name, &bytes).map(|p| (p, bytes)));
            (rendered, sink)
        })
        .await
        .map_err(|e| Error::Render(format!("Render task failed: {}", e)))?;
        let (path, bytes) = rendered?;
        let mut sink = sink;

        info!("Wrote {} ({} bytes)", path.display(), bytes.len());

        let download_url = match publish {
            Some(target) => self.publish(&bytes, &filename, &target, &mut sink).await,
            None => None,
        };

        Ok(sink.finish(RenderResult {
            output_path: path.display().to_string(),
            download_url,
        }))
    }

    async fn figure_bytes(
        &self,
        record: &ArticleRecord,
        template: &Template,
        sink: &mut WarningSink,
    ) -> Option<Vec<u8>> {
        let figure = record.figure_image_ref.as_ref()?;

        match template.shape(regions::FIGURE) {
            Some(shape) if shape.frame.is_some() => {}
            Some(_) => {
                sink.push(
                    WarningKind::MissingRegion,
                    "Template 'figure' region has no explicit position; figure not placed",
                );
                return None;
            }
            None => {
                sink.push(
                    WarningKind::MissingRegion,
                    "Template has no 'figure' region; figure not placed",
                );
                return None;
            }
        }

        match figure::load(figure, &self.fetcher).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                sink.push(
                    WarningKind::FigureUnavailable,
                    format!("Figure could not be retrieved: {}", e),
                );
                None
            }
        }
    }

    async fn publish(
        &self,
        bytes: &[u8],
        filename: &str,
        target: &PublishTarget,
        sink: &mut WarningSink,
    ) -> Option<String> {
        let Some(publisher) = self.publisher.as_ref() else {
            sink.push(
                WarningKind::PublishFailed,
                "Publishing was requested but no publisher is configured",
            );
            return None;
        };

        debug!("Publishing {} via {}", filename, publisher.name());
        match tokio::time::timeout(self.publish_timeout, publisher.upload(bytes, filename, target)).await {
            Ok(Ok(url)) => {
                info!("Published {} to {}", filename, url);
                Some(url)
            }
            Ok(Err(e)) => {
                sink.push(WarningKind::PublishFailed, format!("Upload failed: {}", e));
                None
            }
            Err(_) => {
                sink.push(
                    WarningKind::PublishFailed,
                    format!(
                        "Upload timed out after {}s",
                        self.publish_timeout.as_secs()
                    ),
                );
                None
            }
        }
    }
}

/// Fills the template and serializes the package. CPU-bound.
pub fn render(
    template: Template,
    record: &ArticleRecord,
    figure: Option<Vec<u8>>,
    sink: &mut WarningSink,
) -> Result<Vec<u8>> {
    let texts = plan_text(record, &template, sink);
    let figure_region = template.shape(regions::FIGURE).and_then(|s| s.frame);
    let (mut package, slide_path) = template.into_package();

    let mut fill = SlideFill {
        texts,
        picture: None,
    };

    if let (Some(bytes), Some(region)) = (figure, figure_region) {
        match figure::prepare(&bytes) {
            Ok(prepared) => {
                let media = package.unused_part_name("ppt/media", "va_figure", "png");
                let target = format!("../media/{}", media.trim_start_matches("ppt/media/"));
                let rel_id =
                    package.add_relationship(&rels_path_for(&slide_path), REL_TYPE_IMAGE, &target)?;
                package.ensure_default_content_type("png", "image/png")?;
                package.put(&media, prepared.png);
                fill.picture = Some(PictureFill {
                    region: regions::FIGURE.to_string(),
                    rel_id,
                    frame: figure::fit_within(region, prepared.width, prepared.height),
                });
            }
            Err(e) => sink.push(
                WarningKind::FigureUnavailable,
                format!("Figure could not be decoded: {}", e),
            ),
        }
    }

    let slide = fill_slide(&package.get_str(&slide_path)?, &fill)?;
    package.put(&slide_path, slide.into_bytes());
    package.to_bytes()
}

/// Validates a caller-supplied file name and gives it a `.pptx` extension.
pub fn output_file_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::Render(format!("Invalid output filename: '{}'", name)));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::Render(format!(
            "Output filename must not contain path separators: '{}'",
            name
        )));
    }
    if name.to_ascii_lowercase().ends_with(".pptx") {
        Ok(name.to_string())
    } else {
        Ok(format!("{}.pptx", name))
    }
}

/// Writes through a temp file in `dir` and renames it into place.
fn write_output(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(&path).map_err(|e| Error::Io(e.error))?;
    Ok(path)
}
