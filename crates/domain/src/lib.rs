//! Shared types for the smartmob agent: the process record, its state
//! machine, the on-disk workspace layout, and the error taxonomy every
//! other crate converts its failures into.

pub mod error;
pub mod record;
pub mod sink;
pub mod state;

pub use error::{Error, Result};
pub use record::{ProcessRecord, Slug, WorkspacePaths};
pub use sink::{EventSink, NullSink};
pub use state::{ProcessState, StopSignal};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_app_dot_node() {
        let slug = Slug::new("foo", "web.0");
        assert_eq!(slug.as_str(), "foo.web.0");
    }

    #[test]
    fn state_wire_strings_match_contract() {
        assert_eq!(ProcessState::Pending.as_str(), "pending");
        assert_eq!(ProcessState::NoProcfile.as_str(), "no procfile");
        assert_eq!(
            ProcessState::UnknownProcessType.as_str(),
            "unknown process type"
        );
        assert_eq!(ProcessState::DownloadFailure.as_str(), "download failure");
        assert_eq!(
            ProcessState::VirtualEnvironmentFailure.as_str(),
            "virtual environment failure"
        );
        assert_eq!(ProcessState::PipInstallFailure.as_str(), "pip install failure");
    }

    #[test]
    fn terminal_classification() {
        assert!(ProcessState::NoProcfile.is_terminal());
        assert!(!ProcessState::NoProcfile.is_error());
        assert!(ProcessState::DownloadFailure.is_terminal());
        assert!(ProcessState::DownloadFailure.is_error());
        assert!(!ProcessState::Running.is_terminal());
    }

    #[tokio::test]
    async fn stop_signal_is_idempotent() {
        let sig = StopSignal::new();
        sig.fire();
        sig.fire();
        assert!(sig.is_fired());
        // Must not hang: wait() after fire() returns immediately.
        sig.wait().await;
    }

    #[tokio::test]
    async fn stop_signal_wakes_a_waiter() {
        let sig = std::sync::Arc::new(StopSignal::new());
        let waiter = sig.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });
        tokio::task::yield_now().await;
        sig.fire();
        handle.await.expect("waiter task panicked");
    }

    #[test]
    fn workspace_paths_are_keyed_by_slug() {
        let paths = WorkspacePaths::new(std::path::PathBuf::from("/tmp/.smartmob"));
        let slug = Slug::new("foo", "web.0");
        assert_eq!(
            paths.archive_path(&slug),
            std::path::PathBuf::from("/tmp/.smartmob/archives/foo.web.0")
        );
        assert_eq!(
            paths.source_path(&slug),
            std::path::PathBuf::from("/tmp/.smartmob/sources/foo.web.0")
        );
        assert_eq!(
            paths.env_path(&slug),
            std::path::PathBuf::from("/tmp/.smartmob/envs/foo.web.0")
        );
    }
}
