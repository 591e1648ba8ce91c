pub mod github;
pub mod memory;

pub use github::{GithubConfig, GithubReleasePublisher};
pub use memory::MemoryPublisher;
