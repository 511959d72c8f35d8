//! Bootstrap of the on-disk workspace (C1): the three sibling directories
//! every deployed process owns a subpath under.

use std::path::PathBuf;

use smartmob_domain::WorkspacePaths;

/// Create `archives/`, `sources/`, and `envs/` under `root`. Missing any
/// of them at startup is fatal — callers propagate the `io::Error` up to
/// the bootstrap sequence, which exits non-zero.
pub fn bootstrap(root: PathBuf) -> std::io::Result<WorkspacePaths> {
    let paths = WorkspacePaths::new(root);
    std::fs::create_dir_all(paths.archives_dir())?;
    std::fs::create_dir_all(paths.sources_dir())?;
    std::fs::create_dir_all(paths.envs_dir())?;
    Ok(paths)
}
