use std::fmt;
use std::path::PathBuf;

use log::debug;

use crate::transform::PageWarning;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
/// A recoverable problem encountered during a conversion run.
///
/// Warnings never abort a run. They are collected in the [`Report`] so they can be reported
/// together once the run has finished.
pub enum Warning {
    /// Something about a page's content needs manual attention.
    Page { path: PathBuf, warning: PageWarning },

    /// A top-level folder of the graph which has no Obsidian counterpart was left out.
    SkippedFolder { path: PathBuf },

    /// The output file was written, but its access and modification times couldn't be copied
    /// from the source.
    TimestampsNotPreserved { path: PathBuf, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page { path, warning } => write!(f, "{}: {warning}", path.display()),
            Self::SkippedFolder { path } => write!(
                f,
                "skipping '{}' (Logseq whiteboards are not supported)",
                path.display()
            ),
            Self::TimestampsNotPreserved { path, message } => write!(
                f,
                "could not preserve timestamps for '{}': {message}",
                path.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Summary of a finished conversion run, returned by [`Converter::run`][crate::Converter::run].
pub struct Report {
    /// Number of Markdown files written (or, in a dry run, that would have been written).
    pub written: usize,
    /// Number of other files copied as-is.
    pub copied: usize,
    /// Number of distinct block identifiers found across all pages.
    pub block_ids: usize,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub(crate) fn warn(&mut self, warning: Warning) {
        debug!("Recorded warning: {warning}");
        self.warnings.push(warning);
    }
}
