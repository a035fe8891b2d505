pub mod builder;
pub mod cover;
pub mod document;
#[cfg(test)]
pub(crate) mod fixtures;

pub use builder::DocumentBuilder;
pub use cover::{render_cover, CoverStyle};
pub use document::PdfDocument;
