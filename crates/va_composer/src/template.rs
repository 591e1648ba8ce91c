use std::path::Path;

use va_core::{Error, Result};

use crate::builtin;
use crate::layout::regions;
use crate::package::Package;
use crate::slide::{index_shapes, Shape};

/// A loaded template: the package plus an index of the named shapes on its first slide.
#[derive(Debug, Clone)]
pub struct Template {
    package: Package,
    slide_path: String,
    shapes: Vec<Shape>,
}

impl Template {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::read(bytes)?;
        let slide_path = package.first_slide_path()?;
        let shapes = index_shapes(&package.get_str(&slide_path)?)?;

        let template = Self {
            package,
            slide_path,
            shapes,
        };
        if !template.has_region(regions::TITLE) {
            return Err(Error::Template(format!(
                "Template slide has no '{}' region",
                regions::TITLE
            )));
        }
        Ok(template)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Template(format!("Cannot open template {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_bytes(&builtin::template_bytes()?)
    }

    pub fn shape(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn has_region(&self, name: &str) -> bool {
        self.shape(name).is_some()
    }

    /// Number of consecutive `section_N_body` regions starting at 1.
    pub fn section_capacity(&self) -> usize {
        (1..)
            .take_while(|&n| self.has_region(&regions::section_body(n)))
            .count()
    }

    pub fn slide_path(&self) -> &str {
        &self.slide_path
    }

    pub fn into_package(self) -> (Package, String) {
        (self.package, self.slide_path)
    }
}
