// src/exec/command.rs

//! Concrete, per-attempt command lines.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::errors::{PipetaskError, Result};
use crate::item::Item;
use crate::realize::{realize_all, realize_string};
use crate::task::TaskDescriptor;

/// A task's templates realized against an item's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// `None` inherits the parent environment, `Some` replaces it.
    pub env: Option<BTreeMap<String, String>>,
    pub cwd: Option<PathBuf>,
    /// `None` closes stdin without writing.
    pub stdin: Option<String>,
}

impl ResolvedCommand {
    pub fn resolve(task: &TaskDescriptor, item: &Item) -> Result<Self> {
        let mut argv = realize_all(task.args(), item)?.into_iter();
        let program = argv.next().ok_or_else(|| {
            PipetaskError::ConfigError(format!("task '{}' has an empty argument vector", task.name()))
        })?;

        let env = match task.env_template() {
            Some(templates) => {
                let mut env = BTreeMap::new();
                for (key, template) in templates {
                    env.insert(key.clone(), realize_string(template, item)?);
                }
                Some(env)
            }
            None => None,
        };

        let cwd = task
            .cwd_template()
            .map(|t| realize_string(t, item).map(PathBuf::from))
            .transpose()?;

        let stdin = task.stdin_source().content(item)?;

        Ok(Self {
            program,
            args: argv.collect(),
            env,
            cwd,
            stdin,
        })
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
