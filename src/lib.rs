//! Assemble maths practice sets: a generated cover page listing the chosen
//! questions, followed by their question pages and then their solution pages,
//! pulled from local or remote source PDFs.

pub mod assemble;
pub mod config;
pub mod error;
pub mod page_range;
pub mod pdf;
pub mod record;
pub mod selection;
pub mod source;

pub use assemble::{Assembler, Assembly, BuildReport, Skip, SourceCheck};
pub use config::{Config, EmptyPagesPolicy};
pub use error::{Error, FetchError, Result};
pub use page_range::parse_page_spec;
pub use record::{load_records, SelectionRecord};
