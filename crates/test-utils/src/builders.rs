#![allow(dead_code)]

use std::collections::BTreeMap;

use pipetask::config::{
    ConfigFile, ConfigSection, DefaultSection, ItemConfig, MaxTries, RawConfigFile, TaskConfig,
};
use pipetask::item::ItemValue;
use pipetask::realize::Template;
use pipetask::types::TaskKind;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: Vec::new(),
                item: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_item(mut self, name: &str, properties: &[(&str, ItemValue)]) -> Self {
        self.config.item.push(ItemConfig {
            name: name.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        self
    }

    pub fn with_default_max_tries(mut self, max_tries: MaxTries) -> Self {
        self.config.default.max_tries = Some(max_tries);
        self
    }

    pub fn with_default_retry_delay(mut self, secs: u64) -> Self {
        self.config.default.retry_delay = Some(secs);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task: TaskConfig {
                kind,
                name: None,
                args: vec![],
                max_tries: None,
                retry_delay: None,
                accept_on_exit_code: None,
                retry_on_exit_code: None,
                env: None,
                cwd: None,
                stdin: None,
                target: None,
                files: vec![],
                target_source_path: None,
                bwlimit: None,
            },
        }
    }

    /// An external task running `args`.
    pub fn external(name: &str, args: &[&str]) -> Self {
        Self::new(TaskKind::External).name(name).args(args)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = Some(name.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.task.args = args.iter().map(|a| Template::from(*a)).collect();
        self
    }

    pub fn max_tries(mut self, max_tries: MaxTries) -> Self {
        self.task.max_tries = Some(max_tries);
        self
    }

    pub fn retry_delay(mut self, secs: u64) -> Self {
        self.task.retry_delay = Some(secs);
        self
    }

    pub fn accept_on_exit_code(mut self, codes: &[i32]) -> Self {
        self.task.accept_on_exit_code = Some(codes.to_vec());
        self
    }

    pub fn retry_on_exit_code(mut self, codes: &[i32]) -> Self {
        self.task.retry_on_exit_code = Some(codes.to_vec());
        self
    }

    pub fn env(mut self, vars: &[(&str, &str)]) -> Self {
        let env: BTreeMap<String, Template> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), Template::from(*v)))
            .collect();
        self.task.env = Some(env);
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.task.cwd = Some(Template::from(cwd));
        self
    }

    pub fn stdin(mut self, stdin: &str) -> Self {
        self.task.stdin = Some(Template::from(stdin));
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.task.target = Some(Template::from(target));
        self
    }

    pub fn files(mut self, files: &[&str]) -> Self {
        self.task.files = files.iter().map(|f| Template::from(*f)).collect();
        self
    }

    pub fn target_source_path(mut self, path: &str) -> Self {
        self.task.target_source_path = Some(Template::from(path));
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
