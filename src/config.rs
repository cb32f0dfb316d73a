use crate::{
    errors::{FileOperation, IoError},
    utils::{base_name, resolve_path},
};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(sassify::config::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(sassify::config::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("file entry #{index} is invalid: {reason}")]
    #[diagnostic(
        code(sassify::config::invalid_descriptor),
        help("Every [[files]] entry needs a non-empty `source` and `dest`")
    )]
    InvalidDescriptor { index: usize, reason: String },
}

/// One source/destination pair to process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileDescriptor {
    /// Module whose exported value is rendered.
    pub source: PathBuf,
    /// Stylesheet written by the render step.
    pub dest: PathBuf,
    /// Overrides the bundled template.
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// Group name used when the export holds exactly one group.
    #[serde(default, alias = "mapName")]
    pub map_name: Option<String>,
    #[serde(default, alias = "disableDirectoryCreation")]
    pub disable_directory_creation: bool,
}
impl FileDescriptor {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            template: None,
            map_name: None,
            disable_directory_creation: false,
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = Some(map_name.into());
        self
    }

    pub fn without_directory_creation(mut self) -> Self {
        self.disable_directory_creation = true;
        self
    }

    /// Name given to the only group of a single-export module.
    pub fn single_group_name(&self) -> String {
        match &self.map_name {
            Some(name) => name.clone(),
            None => base_name(&self.dest),
        }
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let reason = if self.source.as_os_str().is_empty() {
            "`source` is empty"
        } else if self.dest.as_os_str().is_empty() {
            "`dest` is empty"
        } else {
            return Ok(());
        };

        log::error!("invalid file entry #{index}: {reason}");

        Err(ConfigError::InvalidDescriptor {
            index,
            reason: reason.to_string(),
        })
    }

    fn resolve_against(mut self, base: &Path) -> Self {
        self.source = resolve_path(base, &self.source);
        self.dest = resolve_path(base, &self.dest);
        self.template = self.template.map(|template| resolve_path(base, &template));
        self
    }
}

/// Resource ceilings applied to every sandboxed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Iterations any single loop may run.
    pub loop_iteration_limit: u64,
    /// Nested function calls.
    pub recursion_limit: usize,
    /// Values on the engine's operand stack.
    pub stack_size_limit: usize,
    /// Wall-clock budget for one evaluation, unbounded when absent or `0`.
    pub timeout_ms: Option<u64>,
}
impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 1_000_000,
            recursion_limit: 256,
            stack_size_limit: 10 * 1024,
            timeout_ms: Some(5_000),
        }
    }
}
impl SandboxLimits {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Contents of a `sassify.toml` file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxLimits,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}
impl Config {
    pub const DEFAULT_FILE_NAME: &'static str = "sassify.toml";

    /// Reads and validates a config file. Relative paths inside it are resolved against the
    /// directory holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));

        Self::from_toml_str(&content, base).map_err(|error| match error {
            ConfigError::ParseToml { source, .. } => ConfigError::ParseToml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let parsed: Config = toml::from_str(content).map_err(|error| {
            log::error!("failed to parse config: {error}");

            ConfigError::ParseToml {
                path: PathBuf::new(),
                source: error,
            }
        })?;

        let files = parsed
            .files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                file.validate(index)?;
                Ok(file.resolve_against(base))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        log::debug!("loaded {} file entries", files.len());

        Ok(Config {
            sandbox: parsed.sandbox,
            files,
        })
    }
}
