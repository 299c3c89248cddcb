//! Tree transformation: maps an input file or directory onto the output
//! directory, rendering templated names and `.templated` file contents.

use log::{debug, info};
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs::{self, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::TEMPLATED_SUFFIX;
use crate::error::{Error, Result};
use crate::renderer::TemplateRenderer;

/// Checks that the input template exists.
pub fn ensure_input_path<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    let input = input.as_ref();
    match fs::metadata(input) {
        Ok(_) => Ok(input.to_path_buf()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::InputValidationError(
            format!("input template '{}' does not exist", input.display()),
        )),
        Err(e) => Err(Error::InputValidationError(format!(
            "input template '{}' cannot be read ({e})",
            input.display()
        ))),
    }
}

/// Checks that the output directory exists and is a directory.
///
/// # Arguments
/// * `output_dir` - Directory the output tree is written into
///
/// # Returns
/// * `Result<PathBuf>` - The validated path
///
/// # Errors
/// * `Error::InputValidationError` if the path is missing, unreadable or a file
pub fn ensure_output_dir<P: AsRef<Path>>(output_dir: P) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    match fs::metadata(output_dir) {
        Ok(meta) if meta.is_dir() => Ok(output_dir.to_path_buf()),
        Ok(_) => Err(Error::InputValidationError(format!(
            "output directory '{}' cannot be a file",
            output_dir.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::InputValidationError(
            format!("output directory '{}' does not exist", output_dir.display()),
        )),
        Err(e) => Err(Error::InputValidationError(format!(
            "output directory '{}' cannot be read ({e})",
            output_dir.display()
        ))),
    }
}

/// Whether a rendered file name marks its contents as a template.
pub fn is_templated_file(name: &str) -> bool {
    name.ends_with(TEMPLATED_SUFFIX)
}

/// Output name of a templated file.
///
/// # Arguments
/// * `name` - Rendered file name ending with `.templated`
///
/// # Returns
/// * `Option<&str>` - The name without the marker, trimmed; `None` when
///   nothing is left
pub fn strip_templated_suffix(name: &str) -> Option<&str> {
    name.strip_suffix(TEMPLATED_SUFFIX)
        .map(str::trim)
        .filter(|stripped| !stripped.is_empty())
}

/// Output directory whose permissions are applied once its subtree is done.
struct OpenDir {
    target: PathBuf,
    permissions: Permissions,
}

/// Walks an input tree and materialises the output tree.
pub struct Processor<'a> {
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> Processor<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer) -> Self {
        Self { renderer }
    }

    /// Transforms `input` (file or directory) into `output_dir`.
    ///
    /// The walk is depth-first, parents before children, siblings in file
    /// name order. The first failure aborts the walk; output written up to
    /// that point is left in place.
    ///
    /// # Arguments
    /// * `input` - Template file or directory
    /// * `output_dir` - Existing directory receiving the output tree
    ///
    /// # Errors
    /// * `Error::ProcessError` naming the source node that failed
    pub fn process(&self, input: &Path, output_dir: &Path) -> Result<()> {
        let input = resolve_input(input)?;
        let output_canonical = fs::canonicalize(output_dir).ok();

        let mut open_dirs: Vec<OpenDir> = Vec::new();
        let mut walker = WalkDir::new(&input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| input.clone());
                Error::IoError(e.into()).at(path)
            })?;
            let source = entry.path();
            let is_dir = entry.file_type().is_dir();

            close_dirs(&mut open_dirs, entry.depth())?;

            if is_dir && entry.depth() > 0 && is_output_dir(source, output_canonical.as_deref()) {
                debug!("Skipping '{}': it is the output directory", source.display());
                walker.skip_current_dir();
                continue;
            }

            let parent = open_dirs.last().map_or(output_dir, |dir| dir.target.as_path());
            let target = self.target_path(source, parent, entry.depth(), output_dir);
            let target = target.map_err(|e| e.at(source))?;
            let Some(target) = target else {
                debug!("Skipping '{}': its name renders empty", source.display());
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            };

            let permissions = entry
                .metadata()
                .map_err(|e| Error::IoError(e.into()).at(source))?
                .permissions();

            if is_dir {
                info!("Processing '{}/' -> '{}/'", source.display(), target.display());
                create_output_dir(&target).map_err(|e| e.at(source))?;
                open_dirs.push(OpenDir { target, permissions });
            } else {
                self.process_file(source, target, permissions)
                    .map_err(|e| e.at(source))?;
            }
        }

        close_dirs(&mut open_dirs, 0)
    }

    /// Output path of a node, `None` when the node must be skipped.
    fn target_path(
        &self,
        source: &Path,
        parent: &Path,
        depth: usize,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(base) = source.file_name() else {
            // Only the filesystem root has no name; it maps onto the output directory.
            return Ok((depth == 0).then(|| output_dir.to_path_buf()));
        };
        Ok(self.target_name(base.to_os_string())?.map(|name| parent.join(name)))
    }

    /// Renders a base name when it contains placeholders, then trims it.
    ///
    /// # Arguments
    /// * `base` - Base name of the source node
    ///
    /// # Returns
    /// * `Result<Option<OsString>>` - Output base name, `None` when the name
    ///   is blank and the node is skipped
    ///
    /// # Errors
    /// * Any render error of the name template
    /// * `Error::InputValidationError` if the name renders to `.`, `..` or
    ///   something containing a path separator
    pub fn target_name(&self, base: OsString) -> Result<Option<OsString>> {
        let Some(text) = base.to_str() else {
            return Ok(Some(base));
        };

        let rendered = if self.renderer.is_templated(text) {
            Cow::Owned(self.renderer.render(text)?)
        } else {
            Cow::Borrowed(text)
        };

        let trimmed = rendered.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed == "." || trimmed == ".." || trimmed.contains(std::path::is_separator) {
            return Err(Error::InputValidationError(format!(
                "name '{text}' renders to '{trimmed}', which is not a plain file name"
            )));
        }
        Ok(Some(OsString::from(trimmed)))
    }

    fn process_file(&self, source: &Path, target: PathBuf, permissions: Permissions) -> Result<()> {
        let name = target.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        let target = if is_templated_file(name) {
            let Some(stripped) = strip_templated_suffix(name) else {
                debug!("Skipping '{}': nothing left after '{TEMPLATED_SUFFIX}'", source.display());
                return Ok(());
            };
            let target = target.with_file_name(stripped);
            info!("Processing '{}' -> '{}'", source.display(), target.display());
            let content = fs::read_to_string(source)?;
            let rendered = self.renderer.render(&content)?;
            fs::write(&target, rendered)?;
            target
        } else {
            info!("Processing '{}' -> '{}'", source.display(), target.display());
            fs::copy(source, &target)?;
            target
        };

        fs::set_permissions(&target, permissions)?;
        Ok(())
    }
}

/// Input paths without a base name (`.`, `..`) are resolved so the root
/// node gets a real name.
fn resolve_input(input: &Path) -> Result<PathBuf> {
    if input.file_name().is_some() {
        return Ok(input.to_path_buf());
    }
    fs::canonicalize(input).map_err(|e| Error::IoError(e).at(input))
}

fn is_output_dir(source: &Path, output_canonical: Option<&Path>) -> bool {
    match output_canonical {
        Some(output) => fs::canonicalize(source).is_ok_and(|source| source == output),
        None => false,
    }
}

/// Creates one output directory; an existing directory is accepted.
fn create_output_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
            debug!("Directory '{}' already exists", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Closes open directories, innermost first, until `depth` remain open.
/// Closing a directory applies its source permissions.
fn close_dirs(open_dirs: &mut Vec<OpenDir>, depth: usize) -> Result<()> {
    while open_dirs.len() > depth {
        if let Some(dir) = open_dirs.pop() {
            fs::set_permissions(&dir.target, dir.permissions)
                .map_err(|e| Error::IoError(e).at(&dir.target))?;
        }
    }
    Ok(())
}
