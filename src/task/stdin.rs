// src/task/stdin.rs

//! Content written to a process's standard input before it is closed.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::item::Item;
use crate::realize::{Template, realize, realize_string};

/// Custom stdin supplier keyed by item.
pub type StdinFn = Arc<dyn Fn(&Item) -> Result<String> + Send + Sync>;

#[derive(Clone, Default)]
pub enum StdinSource {
    /// Close stdin immediately.
    #[default]
    Empty,
    /// A single realized template.
    Template(Template),
    /// One path per line, relative to `base`, newline-terminated.
    FileList { files: Vec<Template>, base: Template },
    Custom(StdinFn),
}

impl fmt::Debug for StdinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdinSource::Empty => f.write_str("Empty"),
            StdinSource::Template(t) => f.debug_tuple("Template").field(t).finish(),
            StdinSource::FileList { files, base } => f
                .debug_struct("FileList")
                .field("files", files)
                .field("base", base)
                .finish(),
            StdinSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl StdinSource {
    /// Content for `item`, or `None` when stdin should just be closed.
    pub fn content(&self, item: &Item) -> Result<Option<String>> {
        match self {
            StdinSource::Empty => Ok(None),
            StdinSource::Template(template) => Ok(Some(realize_string(template, item)?)),
            StdinSource::FileList { files, base } => {
                let base = realize_string(base, item)?;
                let mut out = String::new();
                for file in files {
                    for path in realize(file, item)? {
                        let rel = relative_path(Path::new(&path), Path::new(&base))?;
                        out.push_str(&rel.to_string_lossy());
                        out.push('\n');
                    }
                }
                Ok(Some(out))
            }
            StdinSource::Custom(f) => Ok(Some(f(item)?)),
        }
    }
}

/// Lexical relative path from `base` to `path`.
///
/// Relative inputs are interpreted against the current directory. Neither
/// path has to exist; symlinks are not resolved.
pub fn relative_path(path: &Path, base: &Path) -> io::Result<PathBuf> {
    let path = absolute_normalized(path)?;
    let base = absolute_normalized(base)?;

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Ok(rel)
}

fn absolute_normalized(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}
