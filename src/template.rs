use crate::{
    config::FileDescriptor,
    errors::{FileOperation, IoError},
    flatten::VarMap,
    transactions::{Active, RollbackOperation, Transaction},
};
use miette::Diagnostic;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tera::{Context, Tera};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("I/O error within template domain")]
    #[diagnostic(code(sassify::template::io))]
    Io(#[from] IoError),

    #[error("Error occurred attempting to render template: {source}")]
    #[diagnostic(
        code(sassify::template::render),
        help("Group names are substituted for `__rootKey__`; entries expose `keyName` and `keyValue`")
    )]
    Render {
        #[source]
        source: tera::Error,
    },

    #[error("group name '{name}' contains every tera quote character")]
    #[diagnostic(
        code(sassify::template::unquotable_group),
        help("Rename the exported key or set `map_name`")
    )]
    UnquotableGroup { name: String },
}

/// Token replaced with the group name in every template instance.
pub const ROOT_KEY_PLACEHOLDER: &str = "__rootKey__";
/// Context key holding every group, for names that are not valid identifiers.
pub const GROUPS_CONTEXT_KEY: &str = "groups";
/// Template used when a descriptor does not name one.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/scss-map.tera");

const INSTANCE_SEPARATOR: &str = "\n\n";
const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Renders `data` and writes it to `file.dest`, returning the written path.
///
/// The output is staged next to `dest` and moved over it in one step, so a failure never
/// leaves a truncated file behind. Parent directories are created unless
/// `disable_directory_creation` is set; directories created here are removed again when the
/// write fails.
pub fn render(file: &FileDescriptor, data: VarMap) -> Result<PathBuf, TemplateError> {
    let rendered = render_to_string(file, data)?;

    let mut trx = Transaction::<Active>::new();

    if !file.disable_directory_creation {
        ensure_parent(&mut trx, &file.dest)?;
    }

    write_atomically(&file.dest, &rendered)?;

    trx.commit();

    log::info!("wrote {}", file.dest.display());

    Ok(file.dest.clone())
}

/// Renders `data` with the descriptor's template without touching `dest`.
pub fn render_to_string(file: &FileDescriptor, mut data: VarMap) -> Result<String, TemplateError> {
    let template = read_template(file)?;

    let only_group = match data.len() {
        1 => data.keys().next().map(str::to_string),
        _ => None,
    };
    if let Some(only) = only_group {
        let name = file.single_group_name();
        log::debug!("renaming single group '{only}' to '{name}'");
        data.rename(&only, &name);
    }

    let merged = merge_instances(&template, data.keys())?;

    let mut ctx = Context::new();
    for (group, entries) in data.iter() {
        ctx.insert(group, &entries);
    }
    ctx.insert(GROUPS_CONTEXT_KEY, &data);

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);

    let rendered = tera.render_str(&merged, &ctx).map_err(|error| {
        log::error!("failed to render template for {}: {error}", file.dest.display());
        TemplateError::Render { source: error }
    })?;

    Ok(format!("{}\n", rendered.trim_end_matches(['\n', '\r'])))
}

fn read_template(file: &FileDescriptor) -> Result<String, TemplateError> {
    match &file.template {
        Some(path) => {
            log::debug!("using template {}", path.display());
            let content = fs::read_to_string(path)
                .map_err(|error| IoError::new(FileOperation::Read, path.clone(), error))?;
            Ok(content)
        }
        None => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// One copy of `template` per group, with the placeholder substituted, separated by a blank
/// line.
///
/// A quoted placeholder (`groups["__rootKey__"]`) becomes a tera string literal holding the
/// group name; everywhere else the name is inserted as text tera will not interpret.
fn merge_instances<'a>(
    template: &str,
    groups: impl Iterator<Item = &'a str>,
) -> Result<String, TemplateError> {
    let template = template.trim_end_matches(['\n', '\r']);
    let quoted: Vec<String> = QUOTES
        .iter()
        .map(|quote| format!("{quote}{ROOT_KEY_PLACEHOLDER}{quote}"))
        .filter(|placeholder| template.contains(placeholder.as_str()))
        .collect();

    let instances = groups
        .map(|group| {
            let mut instance = template.to_string();

            if !quoted.is_empty() {
                let literal = string_literal(group).ok_or_else(|| {
                    log::error!("group name '{group}' cannot be quoted in a template");
                    TemplateError::UnquotableGroup {
                        name: group.to_string(),
                    }
                })?;

                for placeholder in &quoted {
                    instance = instance.replace(placeholder.as_str(), &literal);
                }
            }

            Ok(instance.replace(ROOT_KEY_PLACEHOLDER, &verbatim(group)))
        })
        .collect::<Result<Vec<_>, TemplateError>>()?;

    Ok(instances.join(INSTANCE_SEPARATOR))
}

/// Tera has no escape sequences, so the name is wrapped in a quote it does not contain.
fn string_literal(name: &str) -> Option<String> {
    QUOTES
        .iter()
        .find(|quote| !name.contains(**quote))
        .map(|quote| format!("{quote}{name}{quote}"))
}

fn verbatim(name: &str) -> String {
    if ["{{", "{%", "{#"].iter().any(|open| name.contains(open)) {
        format!("{{% raw %}}{name}{{% endraw %}}")
    } else {
        name.to_string()
    }
}

/// Creates the missing parents of `dest`, registering the outermost created directory for
/// rollback.
fn ensure_parent(trx: &mut Transaction<Active>, dest: &Path) -> Result<(), TemplateError> {
    let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    let outermost_missing = parent
        .ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .last()
        .map(Path::to_path_buf);

    let Some(created) = outermost_missing else {
        return Ok(());
    };

    fs::create_dir_all(parent)
        .map_err(|error| IoError::new(FileOperation::Mkdir, parent.to_path_buf(), error))?;

    log::debug!("created {}", parent.display());

    trx.add_operation(RollbackOperation::RemoveDir(created));

    Ok(())
}

fn write_atomically(dest: &Path, contents: &str) -> Result<(), TemplateError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir)
        .map_err(|error| IoError::new(FileOperation::Stage, dir.to_path_buf(), error))?;

    staged
        .write_all(contents.as_bytes())
        .and_then(|_| staged.flush())
        .map_err(|error| IoError::new(FileOperation::Stage, staged.path().to_path_buf(), error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(staged.path(), fs::Permissions::from_mode(0o644)).map_err(|error| {
            IoError::new(FileOperation::Stage, staged.path().to_path_buf(), error)
        })?;
    }

    staged
        .persist(dest)
        .map_err(|error| IoError::new(FileOperation::Write, dest.to_path_buf(), error.error))?;

    Ok(())
}
