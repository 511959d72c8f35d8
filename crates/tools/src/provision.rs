//! Environment provisioner (C5): build an isolated Python runtime per
//! record and install its declared dependencies into it.

use std::path::Path;

use tokio::process::Command;

use smartmob_domain::{Error, Result};

/// `python3 -m venv env_dir`. Fails with `EnvCreateFailed` on non-zero exit
/// or spawn failure.
pub async fn create_env(env_dir: &Path) -> Result<()> {
    let output = Command::new("python3")
        .arg("-m")
        .arg("venv")
        .arg(env_dir)
        .output()
        .await
        .map_err(|e| Error::EnvCreateFailed(format!("failed to spawn python3: {e}")))?;

    if !output.status.success() {
        return Err(Error::EnvCreateFailed(merged_output(&output)));
    }
    Ok(())
}

/// `<env_dir>/bin/pip install -r <source_dir>/requirements.txt`
/// (`<env_dir>/Scripts/pip.exe` on Windows).
///
/// A missing `requirements.txt` is not an error: a zero-dependency app is
/// valid and this step is simply skipped.
pub async fn install_deps(env_dir: &Path, source_dir: &Path) -> Result<()> {
    let requirements = source_dir.join("requirements.txt");
    if !tokio::fs::try_exists(&requirements).await.unwrap_or(false) {
        return Ok(());
    }

    let output = Command::new(pip_path(env_dir))
        .arg("install")
        .arg("-r")
        .arg(&requirements)
        .output()
        .await
        .map_err(|e| Error::DepsInstallFailed(format!("failed to spawn pip: {e}")))?;

    if !output.status.success() {
        return Err(Error::DepsInstallFailed(merged_output(&output)));
    }
    Ok(())
}

#[cfg(windows)]
fn pip_path(env_dir: &Path) -> std::path::PathBuf {
    env_dir.join("Scripts").join("pip.exe")
}

#[cfg(not(windows))]
fn pip_path(env_dir: &Path) -> std::path::PathBuf {
    env_dir.join("bin").join("pip")
}

fn merged_output(output: &std::process::Output) -> String {
    let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
    merged.push_str(&String::from_utf8_lossy(&output.stderr));
    merged.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_deps_is_a_noop_without_requirements_file() {
        let dir = tempfile::tempdir().unwrap();
        install_deps(Path::new("/nonexistent-env"), dir.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_env_surfaces_spawn_failure() {
        // Not on PATH in a sandboxed test run; exercises the spawn-failure arm
        // without depending on a real python3 install.
        let dir = tempfile::tempdir().unwrap();
        let original_path = std::env::var_os("PATH");
        std::env::remove_var("PATH");
        let result = create_env(&dir.path().join("env")).await;
        if let Some(path) = original_path {
            std::env::set_var("PATH", path);
        }
        assert!(matches!(result, Err(Error::EnvCreateFailed(_))));
    }
}
