//! # gallery-renderer
//!
//! Tera rendering of the gallery manifest consumed by the front end.
//!
//! ```rust
//! use gallery_renderer::ManifestRenderer;
//!
//! let renderer = ManifestRenderer::new().unwrap();
//! let text = renderer.render(&["image00002.jpg", "image00001.jpg"]).unwrap();
//! assert_eq!(text, "const manifest = [\n  \"image00002.jpg\",\n  \"image00001.jpg\",\n];\n");
//! ```

pub mod engine;
pub mod error;

pub use engine::ManifestRenderer;
pub use error::RenderError;
