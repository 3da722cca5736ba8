use std::path::{Path, PathBuf};

use ignore::{Walk, WalkBuilder};
use snafu::ResultExt;

use crate::{ConvertError, WalkDirSnafu};

type Result<T, E = ConvertError> = std::result::Result<T, E>;

/// Logseq's own configuration and caches.
pub const METADATA_DIR: &str = "logseq";
/// Whiteboards are stored in a format Obsidian can't read.
pub const WHITEBOARDS_DIR: &str = "whiteboards";

#[derive(Debug, Clone, Copy)]
/// Controls which files of the input graph are considered.
pub struct WalkOptions<'a> {
    /// Name of an additional gitignore-style file which excludes paths from conversion.
    pub ignore_filename: &'a str,
    /// Skip hidden files and directories.
    pub ignore_hidden: bool,
    /// Respect `.gitignore` and friends when the graph is a git repository.
    pub honor_gitignore: bool,
}

impl<'a> WalkOptions<'a> {
    pub fn new() -> WalkOptions<'a> {
        WalkOptions {
            ignore_filename: ".convert-ignore",
            ignore_hidden: true,
            honor_gitignore: true,
        }
    }

    fn build_walker(self, path: &Path) -> Walk {
        WalkBuilder::new(path)
            .standard_filters(false)
            .parents(true)
            .hidden(self.ignore_hidden)
            .add_custom_ignore_filename(self.ignore_filename)
            .require_git(true)
            .git_ignore(self.honor_gitignore)
            .git_global(self.honor_gitignore)
            .git_exclude(self.honor_gitignore)
            .filter_entry(|entry| {
                let top_level_dir =
                    entry.depth() == 1 && entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name();
                !(top_level_dir && (name == METADATA_DIR || name == WHITEBOARDS_DIR))
            })
            .build()
    }
}

impl<'a> Default for WalkOptions<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// The files of a graph, as found by [`graph_contents`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphContents {
    pub files: Vec<PathBuf>,
    /// Top-level folders which were left out and deserve a warning.
    pub skipped: Vec<PathBuf>,
}

/// List every file below `path`.
///
/// The top-level `logseq/` (configuration) and `whiteboards/` folders are not descended into.
/// Only the latter is reported in [`GraphContents::skipped`], as it holds user content.
pub fn graph_contents(path: &Path, opts: WalkOptions) -> Result<GraphContents> {
    let mut contents = GraphContents::default();
    let whiteboards = path.join(WHITEBOARDS_DIR);
    if whiteboards.is_dir() {
        contents.skipped.push(whiteboards);
    }

    let walker = opts.build_walker(path);
    for entry in walker {
        let entry = entry.context(WalkDirSnafu { path })?;
        let path = entry.path();
        let metadata = entry.metadata().context(WalkDirSnafu { path })?;

        if metadata.is_dir() {
            continue;
        }
        contents.files.push(path.to_path_buf());
    }
    contents.files.sort();
    Ok(contents)
}
