use crate::{
    config::{self, Config, FileDescriptor, SandboxLimits},
    errors::IoError,
    parser::parser_for,
    sandbox, template, transform,
};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SassifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transform(#[from] transform::TransformError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Evaluate(#[from] sandbox::EvaluateError),

    #[error("Unable to parse json file at '{path}': {source}")]
    #[diagnostic(code(sassify::json), help("Review json file"))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] template::TemplateError),
}

/// What processing one descriptor did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The rendered stylesheet was written to this path.
    Written(PathBuf),
    /// The export was empty; nothing was written.
    Skipped,
}

/// Result of one descriptor within a batch.
#[derive(Debug)]
pub struct FileReport {
    pub file: FileDescriptor,
    pub result: Result<Outcome, SassifyError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}
impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = (&FileDescriptor, &SassifyError)> {
        self.files.iter().filter_map(|report| match &report.result {
            Ok(_) => None,
            Err(error) => Some((&report.file, error)),
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Evaluates, flattens and renders one descriptor.
///
/// # Errors
///
/// Returns a [`SassifyError`] if:
///
/// - The source or template cannot be read, or `dest` cannot be written.
/// - The source does not parse, or throws or exceeds a limit while it runs.
/// - The template fails to render.
pub fn process_file(
    file: &FileDescriptor,
    limits: &SandboxLimits,
) -> Result<Outcome, SassifyError> {
    log::debug!(
        "processing {} -> {}",
        file.source.display(),
        file.dest.display()
    );

    parser_for(file, limits).run()
}

/// Processes every descriptor in order. A failing descriptor is logged and recorded; the
/// remaining ones are still attempted.
pub fn process_all(files: &[FileDescriptor], limits: &SandboxLimits) -> BatchReport {
    let files = files
        .iter()
        .map(|file| {
            let result = process_file(file, limits);

            if let Err(error) = &result {
                log::error!("{} failed: {error}", file.source.display());
            }

            FileReport {
                file: file.clone(),
                result,
            }
        })
        .collect();

    BatchReport { files }
}

/// Loads `config_path` and processes every file entry it declares.
///
/// # Errors
///
/// Returns a [`SassifyError`] only when the config itself cannot be loaded; per-file
/// failures are reported in the [`BatchReport`].
pub fn build<P: AsRef<Path>>(config_path: P) -> Result<BatchReport, SassifyError> {
    let config_path = config_path.as_ref();

    log::debug!("Attempting to build from: {}", config_path.display());

    let config = Config::from_file(config_path)?;

    if config.files.is_empty() {
        log::warn!("{} declares no files", config_path.display());
    }

    Ok(process_all(&config.files, &config.sandbox))
}
