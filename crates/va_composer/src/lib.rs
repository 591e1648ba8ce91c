pub mod builtin;
pub mod composer;
pub mod figure;
pub mod layout;
pub mod package;
pub mod slide;
pub mod template;

pub use composer::{output_file_name, render, SlideComposer, TemplateSource};
pub use template::Template;
