//! Normalizes module source into what the sandbox's module loader accepts.
//!
//! The sandbox runs ECMAScript modules natively, so the only rewriting needed is removing
//! what a module body may not start with: a byte order mark and a `#!` interpreter line.
//! The result is then parsed once as a module so syntax errors surface here, with a
//! labelled position, instead of at evaluation time.

use boa_engine::{module::Module, Context, Source};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("failed to transform module: {message}")]
#[diagnostic(
    code(sassify::transform),
    help("Sources are evaluated as ECMAScript modules; check the syntax near the label")
)]
pub struct TransformError {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

/// Transforms module source into a script the sandbox can evaluate.
pub fn transform(source: &str) -> Result<String, TransformError> {
    transform_named("module", source)
}

/// Same as [`transform`], with `name` attached to diagnostics.
pub fn transform_named(name: &str, source: &str) -> Result<String, TransformError> {
    let normalized = normalize(source);

    let mut context = Context::default();

    if let Err(error) = Module::parse(Source::from_bytes(&normalized), None, &mut context) {
        let message = error.to_string();
        let span = position(&message)
            .and_then(|(line, column)| offset(&normalized, line, column))
            .map(|offset| SourceSpan::from((offset, 0)));

        log::error!("failed to parse {name}: {message}");

        return Err(TransformError {
            message,
            src: NamedSource::new(name, normalized),
            span,
        });
    }

    Ok(normalized)
}

fn normalize(source: &str) -> String {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);

    match source.strip_prefix("#!") {
        // keep the newline so reported line numbers still match the file
        Some(rest) => rest.find('\n').map(|end| rest[end..].to_string()).unwrap_or_default(),
        None => source.to_string(),
    }
}

/// `(line, column)` from a parser message ending in `at line L, col C`.
fn position(message: &str) -> Option<(usize, usize)> {
    let (_, tail) = message.rsplit_once("line ")?;
    let (line, tail) = tail.split_once(", col ")?;
    let column: String = tail.chars().take_while(char::is_ascii_digit).collect();

    Some((line.trim().parse().ok()?, column.parse().ok()?))
}

/// Byte offset of a 1-based line and column.
fn offset(source: &str, line: usize, column: usize) -> Option<usize> {
    let preceding = line.checked_sub(1)?;
    let lines: Vec<&str> = source.split_inclusive('\n').take(preceding).collect();
    if lines.len() < preceding {
        return None;
    }
    let start: usize = lines.iter().map(|line| line.len()).sum();

    let text = source.get(start..)?;
    let within = text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(index, _)| index)
        .unwrap_or(text.len());

    Some(start + within)
}
