// src/config/pipeline.rs

//! Turning configuration sections into runtime objects.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::model::{ConfigFile, DefaultSection, ItemConfig, TaskConfig};
use crate::engine::Pipeline;
use crate::errors::{PipetaskError, Result};
use crate::item::Item;
use crate::realize::Template;
use crate::task::{RsyncOptions, StdinSource, TaskDescriptor, WgetOptions, rsync_upload, wget_download};
use crate::types::TaskKind;

impl ConfigFile {
    /// Build the pipeline with `[default]` applied to every task.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.config.name.clone());
        for task in &self.task {
            pipeline = pipeline.with_task(task.descriptor(&self.default)?);
        }
        Ok(pipeline)
    }

    /// Items in file order; `only` restricts to the given names when non-empty.
    pub fn items(&self, only: &[String]) -> Result<Vec<Item>> {
        for name in only {
            if !self.item.iter().any(|i| &i.name == name) {
                return Err(PipetaskError::ConfigError(format!("unknown item '{name}'")));
            }
        }

        Ok(self
            .item
            .iter()
            .filter(|i| only.is_empty() || only.contains(&i.name))
            .map(ItemConfig::to_item)
            .collect())
    }
}

impl ItemConfig {
    pub fn to_item(&self) -> Item {
        self.properties
            .iter()
            .fold(Item::new(self.name.clone()), |item, (key, value)| {
                item.with_property(key.clone(), value.clone())
            })
    }
}

impl TaskConfig {
    /// Display name of the task this section produces.
    pub fn display_name(&self) -> String {
        match (&self.name, self.kind) {
            (Some(name), _) => name.clone(),
            (None, TaskKind::Wget) => crate::task::presets::WGET_TASK_NAME.to_string(),
            (None, TaskKind::Rsync) => crate::task::presets::RSYNC_TASK_NAME.to_string(),
            (None, TaskKind::External) => "ExternalProcess".to_string(),
        }
    }

    /// Build the descriptor, falling back to `defaults` for unset fields.
    pub fn descriptor(&self, defaults: &DefaultSection) -> Result<TaskDescriptor> {
        let config_err = |msg: String| PipetaskError::ConfigError(format!("task '{}': {msg}", self.display_name()));

        let max_tries = match self.max_tries.as_ref().or(defaults.max_tries.as_ref()) {
            Some(m) => Some(m.limit().map_err(config_err)?),
            None => None,
        };
        let retry_delay = self
            .retry_delay
            .or(defaults.retry_delay)
            .map(Duration::from_secs);
        let accept = self
            .accept_on_exit_code
            .clone()
            .or_else(|| defaults.accept_on_exit_code.clone());
        let retry_on = self
            .retry_on_exit_code
            .clone()
            .or_else(|| defaults.retry_on_exit_code.clone())
            .map(|codes| codes.into_iter().collect::<BTreeSet<i32>>());

        let task = match self.kind {
            TaskKind::External => {
                let name = self
                    .name
                    .clone()
                    .ok_or_else(|| config_err("external tasks need a `name`".to_string()))?;
                let mut task = TaskDescriptor::new(name, self.args.clone())
                    .retry_on_exit_code(retry_on);
                if let Some(max_tries) = max_tries {
                    task = task.max_tries(max_tries);
                }
                if let Some(delay) = retry_delay {
                    task = task.retry_delay(delay);
                }
                if let Some(accept) = accept {
                    task = task.accept_on_exit_code(accept);
                }
                if let Some(env) = self.env.clone().or_else(|| defaults.env.clone()) {
                    task = task.env(env);
                }
                if let Some(cwd) = self.cwd.clone().or_else(|| defaults.cwd.clone()) {
                    task = task.cwd(cwd);
                }
                if let Some(stdin) = self.stdin.clone() {
                    task = task.stdin(StdinSource::Template(stdin));
                }
                task
            }
            TaskKind::Wget => {
                let mut options = WgetOptions::default();
                if let Some(max_tries) = max_tries {
                    options.max_tries = max_tries;
                }
                if let Some(delay) = retry_delay {
                    options.retry_delay = delay;
                }
                if let Some(accept) = accept {
                    options.accept_on_exit_code = accept.into_iter().collect();
                }
                options.retry_on_exit_code = retry_on;
                options.env = self.env.clone().or_else(|| defaults.env.clone());

                let mut task = wget_download(self.args.clone(), options);
                if let Some(cwd) = self.cwd.clone().or_else(|| defaults.cwd.clone()) {
                    task = task.cwd(cwd);
                }
                task
            }
            TaskKind::Rsync => {
                let target = self
                    .target
                    .clone()
                    .ok_or_else(|| config_err("rsync tasks need a `target`".to_string()))?;
                let mut options = RsyncOptions::default();
                if let Some(path) = self.target_source_path.clone() {
                    options.target_source_path = path;
                }
                if let Some(bwlimit) = self.bwlimit.clone() {
                    options.bwlimit = bwlimit;
                }
                // The upload preset retries without limit unless the task says otherwise.
                if let Some(m) = &self.max_tries {
                    options.max_tries = m.limit().map_err(config_err)?;
                }
                if let Some(delay) = retry_delay {
                    options.retry_delay = delay;
                }

                let mut task = rsync_upload(target, self.files.clone(), options);
                if let Some(accept) = &self.accept_on_exit_code {
                    task = task.accept_on_exit_code(accept.iter().copied());
                }
                if self.retry_on_exit_code.is_some() {
                    task = task.retry_on_exit_code(
                        self.retry_on_exit_code
                            .as_ref()
                            .map(|codes| codes.iter().copied().collect()),
                    );
                }
                task
            }
        };

        let task = match &self.name {
            Some(name) if self.kind != TaskKind::External => task.renamed(name.clone()),
            _ => task,
        };

        Ok(task)
    }
}

/// Convenience for dry-run output.
pub fn describe_templates(templates: &[Template]) -> String {
    templates
        .iter()
        .map(|t| match t {
            Template::Pattern(p) => p.clone(),
            Template::Reference(r) => format!("{r:?}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
