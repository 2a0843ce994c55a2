// src/config/validate.rs

use std::collections::HashSet;

use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipetaskError, Result};
use crate::types::TaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipetaskError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    ensure_has_items(cfg)?;
    validate_task_sections(cfg)?;
    validate_items(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipetaskError::ConfigError(
            "config must contain at least one [[task]] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_items(cfg: &RawConfigFile) -> Result<()> {
    if cfg.item.is_empty() {
        return Err(PipetaskError::ConfigError(
            "config must contain at least one [[item]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_sections(cfg: &RawConfigFile) -> Result<()> {
    for (index, task) in cfg.task.iter().enumerate() {
        let name = task.display_name();

        match task.kind {
            TaskKind::External | TaskKind::Wget if task.args.is_empty() => {
                return Err(PipetaskError::ConfigError(format!(
                    "task #{} ('{}') has an empty `args` list",
                    index + 1,
                    name
                )));
            }
            TaskKind::Rsync if task.files.is_empty() => {
                warn!(task = %name, "rsync task has no `files`; it will upload nothing");
            }
            _ => {}
        }

        // Building the descriptor checks kind-specific required fields and
        // `max_tries` values.
        let descriptor = task.descriptor(&cfg.default)?;

        if descriptor.policy().accept_on_exit_code.is_empty() {
            warn!(task = %name, "accept_on_exit_code is empty; this task can never succeed");
        }
    }
    Ok(())
}

fn validate_items(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for item in cfg.item.iter() {
        if item.name.trim().is_empty() {
            return Err(PipetaskError::ConfigError(
                "every [[item]] needs a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(item.name.as_str()) {
            return Err(PipetaskError::ConfigError(format!(
                "duplicate item name '{}'",
                item.name
            )));
        }
    }
    Ok(())
}
