//! Where each file of the graph ends up in the vault.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::walker::{graph_contents, WalkOptions};
use crate::ConvertError;

type Result<T, E = ConvertError> = std::result::Result<T, E>;

static JOURNAL_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})_(\d{2})_(\d{2})\.md$").unwrap());

const JOURNALS_DIR: &str = "journals";
const PAGES_DIR: &str = "pages";
/// Logseq encodes the `/` of namespaced page names as a triple underscore in file names.
const NAMESPACE_SEPARATOR: &str = "___";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single file of the graph and its place in the output vault.
pub struct FilePlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub is_markdown: bool,
}

/// Returns true for `.md` files (case-insensitive).
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Compute the output location of a file from its path relative to the graph root.
///
/// - `journals/` is renamed to `daily_folder` (when given) and `YYYY_MM_DD.md` journal pages
///   become `YYYY-MM-DD.md`.
/// - `pages/` is dropped, and namespaced pages (`a___b___c.md`) become nested folders
///   (`a/b/c.md`).
/// - Everything else keeps its relative path.
pub fn plan_output_path(relative: &Path, output_root: &Path, daily_folder: Option<&str>) -> PathBuf {
    let markdown = is_markdown(relative);
    let mut parts: Vec<OsString> = relative
        .components()
        .map(|c| c.as_os_str().to_owned())
        .collect();

    match parts.first().and_then(|first| first.to_str()) {
        Some(JOURNALS_DIR) => {
            let folder = daily_folder.filter(|f| !f.is_empty()).unwrap_or(JOURNALS_DIR);
            if let Some(first) = parts.first_mut() {
                *first = folder.into();
            }
            if markdown {
                if let Some(name) = parts.last_mut() {
                    if let Some(renamed) = name.to_str().and_then(journal_file_name) {
                        *name = renamed.into();
                    }
                }
            }
        }
        Some(PAGES_DIR) => {
            parts.remove(0);
            if markdown {
                if let Some(name) = parts.pop() {
                    parts.extend(split_namespace(name));
                }
            }
        }
        _ => {}
    }

    let mut destination = output_root.to_path_buf();
    destination.extend(parts);
    destination
}

fn journal_file_name(name: &str) -> Option<String> {
    let caps = JOURNAL_FILE_RE.captures(name)?;
    Some(format!("{}-{}-{}.md", &caps[1], &caps[2], &caps[3]))
}

/// Split `a___b___c.md` into `["a", "b", "c.md"]`.
fn split_namespace(name: OsString) -> Vec<OsString> {
    let segments = name.to_str().and_then(|text| {
        let (stem, ext) = text.rfind('.').map_or((text, ""), |idx| text.split_at(idx));
        if !stem.contains(NAMESPACE_SEPARATOR) {
            return None;
        }
        let mut segments: Vec<OsString> =
            stem.split(NAMESPACE_SEPARATOR).map(OsString::from).collect();
        if let Some(last) = segments.last_mut() {
            last.push(ext);
        }
        Some(segments)
    });
    segments.unwrap_or_else(|| vec![name])
}

/// The vault-internal name of a file: its path relative to `output_root` with the extension
/// stripped and `/` as separator. This is what Obsidian links resolve against.
pub fn vault_name(path: &Path, output_root: &Path) -> String {
    let relative = path.strip_prefix(output_root).unwrap_or(path);
    relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk the graph at `input_root` and plan the destination of every file.
///
/// Returns the plans together with the top-level folders which were skipped.
pub fn collect_files(
    input_root: &Path,
    output_root: &Path,
    daily_folder: Option<&str>,
    walk_options: WalkOptions,
) -> Result<(Vec<FilePlan>, Vec<PathBuf>)> {
    let contents = graph_contents(input_root, walk_options)?;
    let plans = contents
        .files
        .into_iter()
        .map(|source| {
            let relative = source.strip_prefix(input_root).unwrap_or(&source);
            let destination = plan_output_path(relative, output_root, daily_folder);
            debug!("Planned {} -> {}", source.display(), destination.display());
            FilePlan {
                is_markdown: is_markdown(&source),
                destination,
                source,
            }
        })
        .collect();
    Ok((plans, contents.skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("journals/2024_09_10.md", None, "out/journals/2024-09-10.md")]
    #[case("journals/2024_09_10.md", Some("Daily"), "out/Daily/2024-09-10.md")]
    #[case("journals/2024_09_10.md", Some(""), "out/journals/2024-09-10.md")]
    #[case("journals/notes.md", None, "out/journals/notes.md")]
    #[case("journals/2024_09_10.txt", None, "out/journals/2024_09_10.txt")]
    #[case("pages/Note.md", None, "out/Note.md")]
    #[case("pages/a___b___c.md", None, "out/a/b/c.md")]
    #[case("pages/v1.2___notes.md", None, "out/v1.2/notes.md")]
    #[case("pages/a___b.png", None, "out/a___b.png")]
    #[case("pages/sub/x___y.MD", None, "out/sub/x/y.MD")]
    #[case("assets/pic.png", None, "out/assets/pic.png")]
    #[case("README.md", None, "out/README.md")]
    fn output_paths(
        #[case] relative: &str,
        #[case] daily_folder: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            plan_output_path(Path::new(relative), Path::new("out"), daily_folder),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case("note.md", true)]
    #[case("note.MD", true)]
    #[case("note.markdown", false)]
    #[case("image.png", false)]
    #[case(".md", false)]
    fn markdown_detection(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_markdown(Path::new(path)), expected);
    }

    #[rstest]
    #[case("/vault/folder/note.md", "folder/note")]
    #[case("/vault/note.md", "note")]
    #[case("/vault/v1.2/notes.md", "v1.2/notes")]
    #[case("/elsewhere/note.md", "elsewhere/note")]
    fn vault_names(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(vault_name(Path::new(path), Path::new("/vault")), expected);
    }
}
