//! Tera engine holding the embedded manifest template.

use tera::{Context, Tera};

use crate::error::RenderError;

const MANIFEST_TEMPLATE: &str = "manifest.js";
const MANIFEST_SOURCE: &str = include_str!("templates/manifest.js.tera");

/// Renders an ordered list of image names into the `manifest.js` artifact.
pub struct ManifestRenderer {
    tera: Tera,
}

impl ManifestRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(MANIFEST_TEMPLATE, MANIFEST_SOURCE)?;
        Ok(Self { tera })
    }

    /// Render `entries` in the order given. Each entry is emitted as a JSON
    /// string literal, so quotes and backslashes in names stay valid
    /// JavaScript.
    pub fn render<S: AsRef<str>>(&self, entries: &[S]) -> Result<String, RenderError> {
        let quoted = entries
            .iter()
            .map(|e| serde_json::to_string(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ctx = Context::new();
        ctx.insert("entries", &quoted);
        Ok(self.tera.render(MANIFEST_TEMPLATE, &ctx)?)
    }
}
