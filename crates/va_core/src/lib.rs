pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod publish;
pub mod text;
pub mod types;

pub use config::Config;
pub use diagnostics::{Diagnosed, Warning, WarningKind, WarningSink};
pub use error::{Error, ErrorReport, Result};
pub use fetch::{FetchedBytes, Fetcher};
pub use publish::Publisher;
pub use types::{
    ArticleRecord, Citation, FigureRef, PublishTarget, RenderRequest, RenderResult,
    VisualAbstract, DEFAULT_OUTPUT_FILENAME,
};

pub mod prelude {
    pub use super::{ArticleRecord, Diagnosed, Error, Result, Warning, WarningKind};
}
