pub mod content;
pub mod handlers;
pub mod opener;
pub mod path_utils;
pub mod spa;

use crate::compression::Encoding;
use crate::fs::FileInfo;

/// A document ready to be served, handed over to the content writer.
pub struct OpenedDocument<F> {
    pub file: F,
    /// Cleaned path of the uncompressed document.
    pub path: String,
    /// Base name of `path`; drives the content type and never carries a
    /// compression suffix.
    pub name: String,
    pub info: FileInfo,
    pub encoding: Option<Encoding>,
}
