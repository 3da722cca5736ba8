use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
/// Context holds metadata about a page which is being converted.
///
/// It is passed to [postprocessors][crate::Postprocessor] together with the page's converted text.
pub struct Context {
    source: PathBuf,

    /// The path where this page will be written to.
    ///
    /// Changing this path will result in the page being written to that new path instead, but
    /// beware: links to it from other pages have already been rendered and will not be updated.
    pub destination: PathBuf,

    expected_title: String,
}

impl Context {
    /// Create a new `Context`
    #[inline]
    #[must_use]
    pub fn new(source: PathBuf, destination: PathBuf, expected_title: String) -> Self {
        Self {
            source,
            destination,
            expected_title,
        }
    }

    /// Return the path of the Logseq page being converted.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Return the page's name inside the vault as originally planned: its path relative to the
    /// vault root, without extension and with `/` separators.
    #[inline]
    #[must_use]
    pub fn expected_title(&self) -> &str {
        &self.expected_title
    }
}
