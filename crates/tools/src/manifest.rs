//! Manifest loader (C4): parse a Procfile into a `type -> command` mapping.

use std::collections::HashMap;
use std::path::Path;

use smartmob_domain::{Error, Result};

/// One entry in a Procfile: a command template plus whatever environment
/// the manifest author wants merged on top of the record's own `env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTemplate {
    pub command: String,
    pub env: HashMap<String, String>,
}

/// Read and parse `source_dir/Procfile`.
///
/// Lines are `<type>: <command>`; blank lines and `#`-comments are skipped.
/// A Procfile entry carries no per-line environment syntax of its own in
/// this format, so `env` is always empty — it exists so a richer manifest
/// format could populate it without changing the return type.
pub async fn load_manifest(source_dir: &Path) -> Result<HashMap<String, ProcessTemplate>> {
    let procfile_path = source_dir.join("Procfile");
    let contents = match tokio::fs::read_to_string(&procfile_path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NoManifest),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut types = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, command)) = line.split_once(':') else {
            continue;
        };
        types.insert(
            name.trim().to_string(),
            ProcessTemplate {
                command: command.trim().to_string(),
                env: HashMap::new(),
            },
        );
    }

    Ok(types)
}

/// Look up `process_type` in an already-parsed manifest.
pub fn resolve<'a>(
    types: &'a HashMap<String, ProcessTemplate>,
    process_type: &str,
) -> Result<&'a ProcessTemplate> {
    types
        .get(process_type)
        .ok_or_else(|| Error::UnknownProcessType(process_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_web_and_worker_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Procfile"),
            "# a comment\n\nweb: python dots.py\nworker: python worker.py --verbose\n",
        )
        .unwrap();

        let types = load_manifest(dir.path()).await.unwrap();
        assert_eq!(types.len(), 2);
        assert_eq!(resolve(&types, "web").unwrap().command, "python dots.py");
        assert_eq!(
            resolve(&types, "worker").unwrap().command,
            "python worker.py --verbose"
        );
    }

    #[tokio::test]
    async fn missing_procfile_is_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::NoManifest));
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Procfile"), "web: python dots.py\n").unwrap();
        let types = load_manifest(dir.path()).await.unwrap();
        let err = resolve(&types, "worker").unwrap_err();
        assert!(matches!(err, Error::UnknownProcessType(_)));
    }
}
