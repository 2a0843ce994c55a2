use std::fmt;

use serde::Deserialize;

/// Which task constructor a `[[task]]` section maps to.
///
/// - `External`: a plain external process with a caller-supplied argv.
/// - `Wget`: the download preset; argv supplied, name fixed.
/// - `Rsync`: the upload preset; argv built from `target` / `files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    External,
    Wget,
    Rsync,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::External => "external",
            TaskKind::Wget => "wget",
            TaskKind::Rsync => "rsync",
        };
        f.write_str(s)
    }
}
