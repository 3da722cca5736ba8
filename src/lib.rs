pub extern crate serde_yaml;

mod anchors;
mod blocks;
mod context;
mod dates;
mod fences;
mod frontmatter;
mod headings;
mod links;
mod planner;
mod properties;
mod references;
mod report;
mod tasks;
mod transform;
mod walker;

pub use anchors::attach_block_ids;
pub use blocks::assemble_blocks;
pub use context::Context;
pub use dates::{
    extract_schedule, RepeatUnit, Repeater, RepeaterKind, Schedule, Timestamp, Whitespace,
};
pub use fences::map_outside_fences;
pub use frontmatter::{
    emit_frontmatter, frontmatter_from_properties, frontmatter_from_str, frontmatter_to_str,
    normalize_aliases, normalize_tags, Frontmatter,
};
pub use headings::fix_heading_child_lists;
pub use links::{replace_alias_links, replace_asset_images, replace_namespace_links};
pub use planner::{collect_files, is_markdown, plan_output_path, vault_name, FilePlan};
pub use properties::{parse_page_properties, Properties, Property};
pub use references::{
    build_block_index, replace_block_refs, replace_embeds, rewrite_references, BlockRefIndex,
    PathMap,
};
pub use report::{Report, Warning};
pub use tasks::{transform_task_line, ParseTasksFormatError, Priority, TaskState, TasksFormat};
pub use transform::{transform_markdown, PageWarning, Transformed};
pub use walker::{graph_contents, GraphContents, WalkOptions};

use filetime::FileTime;
use log::{debug, info};
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A post-processing function that is called after a page has been fully converted, just before
/// it is written out to its final destination.
///
/// Postprocessors are called in the order they've been added through
/// [Converter::add_postprocessor]. They receive the page's [Context] and its converted text, both
/// of which may be modified in place, and may be used to:
///
/// 1. Change the destination of a page (see [Context::destination]).
/// 2. Change a page's contents.
/// 3. Prevent later postprocessors from running ([PostprocessorResult::StopHere]) or cause a page
///    to be skipped entirely ([PostprocessorResult::StopAndSkipNote]).
///
/// # Examples
///
/// ## Change page contents
///
/// This example replaces every instance of "Logseq" with "Obsidian" in the converted pages.
///
/// ```
/// # use logseq_to_obsidian::{Context, Converter, PostprocessorResult};
/// # use std::fs::{create_dir_all, write};
/// # use tempfile::TempDir;
/// #
/// fn rename_app(_context: &mut Context, text: &mut String) -> PostprocessorResult {
///     *text = text.replace("Logseq", "Obsidian");
///     PostprocessorResult::Continue
/// }
///
/// # let source = TempDir::new().expect("failed to make tempdir");
/// # let destination = TempDir::new().expect("failed to make tempdir");
/// # create_dir_all(source.path().join("pages")).unwrap();
/// # write(source.path().join("pages/Note.md"), "- Written in Logseq\n").unwrap();
/// let mut converter = Converter::new(source.path().to_path_buf(), destination.path().to_path_buf());
/// converter.add_postprocessor(&rename_app);
/// converter.run().unwrap();
/// # let written = std::fs::read_to_string(destination.path().join("Note.md")).unwrap();
/// # assert_eq!(written, "- Written in Obsidian\n");
/// ```
pub type Postprocessor<'f> =
    dyn Fn(&mut Context, &mut String) -> PostprocessorResult + Send + Sync + 'f;
type Result<T, E = ConvertError> = std::result::Result<T, E>;

#[non_exhaustive]
#[derive(Debug, Snafu)]
/// ConvertError represents all errors which may be returned when using this crate.
pub enum ConvertError {
    #[snafu(display("failed to read from '{}'", path.display()))]
    /// This occurs when a read IO operation fails.
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write to '{}'", path.display()))]
    /// This occurs when a write IO operation fails.
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Encountered an error while trying to walk '{}'", path.display()))]
    /// This occurs when an error is encountered while trying to walk a directory.
    WalkDirError {
        path: PathBuf,
        source: ignore::Error,
    },

    #[snafu(display("No such file or directory: {}", path.display()))]
    /// This occurs when the input graph does not exist.
    PathDoesNotExist { path: PathBuf },

    #[snafu(display("Failed to convert '{}'", path.display()))]
    /// This occurs when a file fails to convert successfully.
    FileConvertError {
        path: PathBuf,
        #[snafu(source(from(ConvertError, Box::new)))]
        source: Box<ConvertError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Emitted by [Postprocessor]s to signal the next action to take.
pub enum PostprocessorResult {
    /// Continue with the next post-processor (if any).
    Continue,
    /// Use this page, but don't run any more post-processors after this one.
    StopHere,
    /// Skip this page (don't write it) and don't run any more post-processors.
    StopAndSkipNote,
}

#[derive(Clone)]
/// Converter provides the main interface to this library.
///
/// Users are expected to create a Converter using [`Converter::new`], optionally followed by
/// customization using the builder methods such as [`Converter::tasks_format`] and
/// [`Converter::walk_options`].
///
/// After that, calling [`Converter::run`] will start the conversion process.
pub struct Converter<'a> {
    root: PathBuf,
    destination: PathBuf,
    tasks_format: TasksFormat,
    daily_folder: Option<String>,
    field_keys: Vec<String>,
    dry_run: bool,
    walk_options: WalkOptions<'a>,
    postprocessors: Vec<&'a Postprocessor<'a>>,
}

impl<'a> fmt::Debug for Converter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("root", &self.root)
            .field("destination", &self.destination)
            .field("tasks_format", &self.tasks_format)
            .field("daily_folder", &self.daily_folder)
            .field("field_keys", &self.field_keys)
            .field("dry_run", &self.dry_run)
            .field("walk_options", &self.walk_options)
            .field(
                "postprocessors",
                &format!("<{} postprocessors active>", self.postprocessors.len()),
            )
            .finish()
    }
}

impl<'a> Converter<'a> {
    /// Create a new converter which reads the Logseq graph at `root` and writes an Obsidian vault
    /// to `destination`.
    pub fn new(root: PathBuf, destination: PathBuf) -> Converter<'a> {
        Converter {
            root,
            destination,
            tasks_format: TasksFormat::default(),
            daily_folder: None,
            field_keys: vec![],
            dry_run: false,
            walk_options: WalkOptions::default(),
            postprocessors: vec![],
        }
    }

    /// Set the [`TasksFormat`] used to render task priorities, dates and repeaters.
    pub fn tasks_format(&mut self, format: TasksFormat) -> &mut Converter<'a> {
        self.tasks_format = format;
        self
    }

    /// Move journal pages into a folder with this name instead of `journals`.
    pub fn daily_folder(&mut self, folder: Option<String>) -> &mut Converter<'a> {
        self.daily_folder = folder;
        self
    }

    /// Set the namespaces whose `[[key/value]]` links become Dataview inline fields.
    pub fn field_keys(&mut self, keys: Vec<String>) -> &mut Converter<'a> {
        self.field_keys = keys;
        self
    }

    /// When enabled, everything is planned and converted but nothing is written to disk.
    pub fn dry_run(&mut self, dry_run: bool) -> &mut Converter<'a> {
        self.dry_run = dry_run;
        self
    }

    /// Set the [`WalkOptions`] to be used for this converter.
    pub fn walk_options(&mut self, options: WalkOptions<'a>) -> &mut Converter<'a> {
        self.walk_options = options;
        self
    }

    /// Append a function to the chain of [postprocessors][Postprocessor] to run on converted pages.
    pub fn add_postprocessor(&mut self, processor: &'a Postprocessor<'a>) -> &mut Converter<'a> {
        self.postprocessors.push(processor);
        self
    }

    /// Convert the graph using the settings configured on this converter.
    ///
    /// Every page is converted on its own first. Block references are only resolved once all
    /// pages have been through that first pass, since they may point at any page in the graph.
    pub fn run(&mut self) -> Result<Report> {
        if !self.root.exists() {
            return Err(ConvertError::PathDoesNotExist {
                path: self.root.clone(),
            });
        }
        info!(
            "Converting Logseq graph '{}' into '{}'",
            self.root.display(),
            self.destination.display()
        );
        debug!("{self:?}");

        let mut report = Report::default();
        let (plans, skipped) = collect_files(
            &self.root,
            &self.destination,
            self.daily_folder.as_deref(),
            self.walk_options,
        )?;
        for path in skipped {
            report.warn(Warning::SkippedFolder { path });
        }
        let markdown_count = plans.iter().filter(|plan| plan.is_markdown).count();
        let other_count = plans.iter().filter(|plan| !plan.is_markdown).count();
        info!(
            "Discovered {} files ({markdown_count} markdown, {other_count} other)",
            plans.len()
        );

        if !self.dry_run {
            fs::create_dir_all(&self.destination).context(WriteSnafu {
                path: &self.destination,
            })?;
        }

        let mut pages = Vec::with_capacity(markdown_count);
        for plan in plans.iter().filter(|plan| plan.is_markdown) {
            let text = self
                .transform_page(plan, &mut report)
                .context(FileConvertSnafu { path: &plan.source })?;
            pages.push((plan.source.clone(), text));
        }

        let index = build_block_index(&pages);
        report.block_ids = index.len();
        info!("Indexed {} block id(s)", index.len());

        let paths: PathMap = plans
            .iter()
            .map(|plan| (plan.source.clone(), plan.destination.clone()))
            .collect();
        let mut pages: HashMap<PathBuf, String> = pages.into_iter().collect();
        for plan in &plans {
            let result = match pages.remove(&plan.source) {
                Some(text) => {
                    let text = rewrite_references(
                        &text,
                        &index,
                        &paths,
                        &self.destination,
                        &self.field_keys,
                    );
                    self.write_page(plan, text, &mut report)
                }
                None => self.copy_asset(plan, &mut report),
            };
            result.context(FileConvertSnafu { path: &plan.source })?;
        }

        info!(
            "Wrote {} markdown file(s), copied {} other file(s)",
            report.written, report.copied
        );
        Ok(report)
    }

    fn transform_page(&self, plan: &FilePlan, report: &mut Report) -> Result<String> {
        let relative = plan.source.strip_prefix(&self.root).unwrap_or(&plan.source);
        info!("Transforming {}", relative.display());

        let content = fs::read_to_string(&plan.source).context(ReadSnafu { path: &plan.source })?;
        let expected_title = vault_name(&plan.destination, &self.destination);
        let transformed = transform_markdown(&content, Some(&expected_title), self.tasks_format);
        for warning in transformed.warnings {
            report.warn(Warning::Page {
                path: relative.to_path_buf(),
                warning,
            });
        }
        Ok(transformed.text)
    }

    fn write_page(&self, plan: &FilePlan, mut text: String, report: &mut Report) -> Result<()> {
        let mut context = Context::new(
            plan.source.clone(),
            plan.destination.clone(),
            vault_name(&plan.destination, &self.destination),
        );
        for func in &self.postprocessors {
            match func(&mut context, &mut text) {
                PostprocessorResult::StopHere => break,
                PostprocessorResult::StopAndSkipNote => return Ok(()),
                PostprocessorResult::Continue => (),
            }
        }

        let dest = context.destination;
        report.written = report.written.saturating_add(1);
        if self.dry_run {
            info!("Would write {}", dest.display());
            return Ok(());
        }
        info!("Writing {}", dest.display());
        let mut outfile = create_file(&dest)?;
        outfile
            .write_all(text.as_bytes())
            .context(WriteSnafu { path: &dest })?;
        drop(outfile);
        preserve_times(&plan.source, &dest, report);
        Ok(())
    }

    fn copy_asset(&self, plan: &FilePlan, report: &mut Report) -> Result<()> {
        report.copied = report.copied.saturating_add(1);
        if self.dry_run {
            info!(
                "Would copy {} -> {}",
                plan.source.display(),
                plan.destination.display()
            );
            return Ok(());
        }
        info!(
            "Copying {} -> {}",
            plan.source.display(),
            plan.destination.display()
        );
        copy_file(&plan.source, &plan.destination)?;
        preserve_times(&plan.source, &plan.destination, report);
        Ok(())
    }
}

/// Give `dest` the access and modification times of `src`. Failure only results in a warning.
fn preserve_times(src: &Path, dest: &Path, report: &mut Report) {
    let result = fs::metadata(src).and_then(|metadata| {
        filetime::set_file_times(
            dest,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
    });
    if let Err(err) = result {
        report.warn(Warning::TimestampsNotPreserved {
            path: dest.to_path_buf(),
            message: err.to_string(),
        });
    }
}

fn create_parent_dir(dest: &Path) -> std::io::Result<()> {
    match dest.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn create_file(dest: &Path) -> Result<File> {
    let file = File::create(dest)
        .or_else(|err| {
            if err.kind() == ErrorKind::NotFound {
                create_parent_dir(dest)?;
            }
            File::create(dest)
        })
        .context(WriteSnafu { path: dest })?;
    Ok(file)
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)
        .or_else(|err| {
            if err.kind() == ErrorKind::NotFound {
                create_parent_dir(dest)?;
            }
            fs::copy(src, dest)
        })
        .context(WriteSnafu { path: dest })?;
    Ok(())
}
