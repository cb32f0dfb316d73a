//! One pipeline per source kind: obtain the exported value, flatten it, render it.

use crate::{
    api::{Outcome, SassifyError},
    config::{FileDescriptor, SandboxLimits},
    errors::{FileOperation, IoError},
    flatten::flatten,
    sandbox::Sandbox,
    template,
    transform::transform_named,
    value::ExportedValue,
};
use std::fs;

const JSON_EXTENSION: &str = "json";

/// A source kind. Implementors only say how the exported value is obtained; flattening and
/// rendering are shared.
pub trait Parser {
    /// The descriptor this parser was built for.
    fn file(&self) -> &FileDescriptor;

    fn evaluate(&self) -> Result<ExportedValue, SassifyError>;

    /// Processes the descriptor end to end.
    ///
    /// An export that flattens to nothing is skipped and `dest` is left untouched.
    fn run(&self) -> Result<Outcome, SassifyError> {
        let file = self.file();
        let value = self.evaluate()?;

        let Some(data) = flatten(&value) else {
            log::info!(
                "{} exports nothing to render, skipping",
                file.source.display()
            );
            return Ok(Outcome::Skipped);
        };

        log::debug!(
            "{} flattened into {} group(s)",
            file.source.display(),
            data.len()
        );

        let dest = template::render(file, data)?;

        Ok(Outcome::Written(dest))
    }
}

/// Script modules, transformed and evaluated in a [`Sandbox`].
pub struct ModuleParser<'a> {
    file: &'a FileDescriptor,
    sandbox: Sandbox,
}
impl<'a> ModuleParser<'a> {
    pub fn new(file: &'a FileDescriptor, limits: &SandboxLimits) -> Self {
        Self {
            file,
            sandbox: Sandbox::new(limits.clone()),
        }
    }
}
impl Parser for ModuleParser<'_> {
    fn file(&self) -> &FileDescriptor {
        self.file
    }

    fn evaluate(&self) -> Result<ExportedValue, SassifyError> {
        let path = &self.file.source;
        let source = read_source(self.file)?;

        let script = transform_named(&path.display().to_string(), &source)?;
        log::trace!("transformed {}:\n{script}", path.display());

        Ok(self.sandbox.evaluate(&script)?)
    }
}

/// Plain data files, parsed without running anything.
pub struct JsonParser<'a> {
    file: &'a FileDescriptor,
}
impl<'a> JsonParser<'a> {
    pub fn new(file: &'a FileDescriptor) -> Self {
        Self { file }
    }
}
impl Parser for JsonParser<'_> {
    fn file(&self) -> &FileDescriptor {
        self.file
    }

    fn evaluate(&self) -> Result<ExportedValue, SassifyError> {
        let source = read_source(self.file)?;

        let json: serde_json::Value = serde_json::from_str(&source).map_err(|error| {
            log::error!("failed to parse {}: {error}", self.file.source.display());
            SassifyError::Json {
                path: self.file.source.clone(),
                source: error,
            }
        })?;

        Ok(ExportedValue::from(json))
    }
}

/// Picks the parser for `file` from its source extension.
pub fn parser_for<'a>(file: &'a FileDescriptor, limits: &SandboxLimits) -> Box<dyn Parser + 'a> {
    let is_json = file
        .source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(JSON_EXTENSION));

    if is_json {
        Box::new(JsonParser::new(file))
    } else {
        Box::new(ModuleParser::new(file, limits))
    }
}

fn read_source(file: &FileDescriptor) -> Result<String, IoError> {
    fs::read_to_string(&file.source)
        .map_err(|error| IoError::new(FileOperation::Read, file.source.clone(), error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn modules_are_evaluated_in_the_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(
            dir.path(),
            "colors.js",
            "export default { colors: { primary: '#fff', secondary: '#000' } };",
        );
        let file = FileDescriptor::new(&source, dir.path().join("colors.scss"));

        let value = parser_for(&file, &SandboxLimits::default()).evaluate().unwrap();

        let ExportedValue::Object(namespace) = value else {
            panic!("expected an object");
        };
        assert_eq!(namespace.keys().collect::<Vec<_>>(), vec!["default"]);
    }

    #[test]
    fn json_sources_skip_the_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "sizes.JSON", r#"{"sizes": {"small": 4, "large": 16}}"#);
        let dest = dir.path().join("out").join("sizes.scss");
        let file = FileDescriptor::new(&source, &dest);

        let outcome = parser_for(&file, &SandboxLimits::default()).run().unwrap();

        assert_eq!(outcome, Outcome::Written(dest.clone()));
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "$sizes: (\n  small: 4,\n  large: 16,\n);\n"
        );
    }

    #[test]
    fn invalid_json_is_reported_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "broken.json", "{ nope");
        let file = FileDescriptor::new(&source, dir.path().join("broken.scss"));

        let error = JsonParser::new(&file).evaluate().unwrap_err();

        assert!(matches!(error, SassifyError::Json { path, .. } if path == source));
    }

    #[test]
    fn empty_exports_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = write(dir.path(), "empty.js", "export default {};");
        let dest = dir.path().join("empty.scss");
        let file = FileDescriptor::new(&source, &dest);

        let outcome = ModuleParser::new(&file, &SandboxLimits::default()).run().unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!dest.exists());
    }

    #[test]
    fn missing_sources_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileDescriptor::new(dir.path().join("nope.js"), dir.path().join("nope.scss"));

        let error = parser_for(&file, &SandboxLimits::default()).run().unwrap_err();

        assert!(matches!(error, SassifyError::Io(_)));
    }
}
