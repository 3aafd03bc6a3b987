//! Build descriptor template
//!
//! The project's own descriptor pins one base image. The template keeps
//! everything except that pin so it can be re-rendered once per version.

use std::io;
use std::path::Path;
use tracing::debug;
use vmatrix_core::domain::version::VersionId;

use crate::error::TemplateError;

/// Base-image directive keyword
pub const BASE_IMAGE_DIRECTIVE: &str = "FROM";

/// Descriptor body with every base-image line removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTemplate {
    body: String,
}

impl BuildTemplate {
    /// Loads `<project_root>/<descriptor_name>` and strips its base-image lines
    pub fn load(project_root: &Path, descriptor_name: &str) -> Result<Self, TemplateError> {
        let path = project_root.join(descriptor_name);

        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TemplateError::DescriptorMissing { path });
            }
            Err(source) => return Err(TemplateError::Read { path, source }),
        };

        let template = Self::from_source(&source);
        debug!(
            "Loaded build template from {} ({} bytes)",
            path.display(),
            template.body.len()
        );
        Ok(template)
    }

    /// Strips base-image lines from descriptor text
    pub fn from_source(source: &str) -> Self {
        let body = source
            .split('\n')
            .filter(|line| !is_base_image_line(line))
            .collect::<Vec<_>>()
            .join("\n");

        Self { body }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Descriptor for one version: the pin line followed by the body verbatim
    pub fn render(&self, base_image: &str, version: &VersionId) -> String {
        format!(
            "{} {}:{}\n{}",
            BASE_IMAGE_DIRECTIVE, base_image, version, self.body
        )
    }
}

/// `FROM` at line start (any case), followed by whitespace or end of line
fn is_base_image_line(line: &str) -> bool {
    let keyword_len = BASE_IMAGE_DIRECTIVE.len();

    match line.get(..keyword_len) {
        Some(head) if head.eq_ignore_ascii_case(BASE_IMAGE_DIRECTIVE) => line[keyword_len..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace),
        _ => false,
    }
}
