use std::path::{Path, PathBuf};

use super::{ContextConfig, ContextError, ContextFormat, ContextStack};

/// Result of loading every configured context file.
#[derive(Debug, Default)]
pub struct ContextLoad {
    pub stack: ContextStack,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, ContextError)>,
}

/// Load context files in order. A file that cannot be read, does not parse,
/// or lives outside `root` is skipped with a warning.
///
/// `root` defaults to the current working directory.
pub fn load_context_files(paths: &[PathBuf], root: Option<&Path>) -> ContextLoad {
    let mut load = ContextLoad::default();
    if paths.is_empty() {
        return load;
    }

    let root = match root {
        Some(root) => Some(root.to_path_buf()),
        None => match std::env::current_dir() {
            Ok(cwd) => Some(cwd),
            Err(e) => {
                tracing::warn!(name: "context.root.unavailable", error = %e, "Cannot determine working directory; context files are not restricted");
                None
            }
        },
    };

    for path in paths {
        match load_context_file(path, root.as_deref()) {
            Ok(config) => {
                tracing::info!(
                    name: "context.file.loaded",
                    path = %path.display(),
                    tools = config.tools.len(),
                    resources = config.resources.len(),
                    prompts = config.prompts.len(),
                    "Context file loaded"
                );
                load.stack.push(config);
            }
            Err(e) => {
                tracing::warn!(name: "context.file.skipped", path = %path.display(), error = %e, "Skipping context file");
                load.skipped.push((path.clone(), e));
            }
        }
    }

    load
}

/// Load a single context file, enforcing the allowed root when given.
pub fn load_context_file(path: &Path, root: Option<&Path>) -> Result<ContextConfig, ContextError> {
    let resolved = match root {
        Some(root) => resolve_within_root(root, path)?,
        None => path.to_path_buf(),
    };

    let text = std::fs::read_to_string(&resolved).map_err(|source| ContextError::Read {
        path: path.display().to_string(),
        source,
    })?;

    ContextConfig::parse(&text, ContextFormat::detect(&resolved, &text))
}

/// Resolve `path` and verify it stays inside `root`.
///
/// Canonicalizes both paths, so `..` segments and symlinks pointing out of
/// the root are rejected.
pub fn resolve_within_root(root: &Path, path: &Path) -> Result<PathBuf, ContextError> {
    let canonical = path.canonicalize().map_err(|source| ContextError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let root_canonical = root.canonicalize().map_err(|source| ContextError::Read {
        path: root.display().to_string(),
        source,
    })?;

    if !canonical.starts_with(&root_canonical) {
        return Err(ContextError::OutsideRoot {
            path: path.display().to_string(),
            root: root.display().to_string(),
        });
    }

    if !canonical.is_file() {
        return Err(ContextError::Invalid(format!("{} is not a regular file", path.display())));
    }

    Ok(canonical)
}
