use std::fmt;

use serde::{Serialize, Serializer};

/// The finite set of states a [`crate::record::ProcessRecord`] can occupy.
///
/// Transitions are monotone along the happy path and jump to exactly one
/// terminal state on failure; see the pipeline module for the state machine
/// that is the only writer of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Pending,
    Downloading,
    Unpacking,
    Processing,
    Running,
    /// Non-error terminal: the Procfile is missing from the unpacked tree.
    NoProcfile,
    /// Non-error terminal: the requested process type is not in the manifest.
    UnknownProcessType,
    /// Error terminal: C2 fetch failed or was rejected.
    DownloadFailure,
    /// Error terminal: C5 environment creation failed.
    VirtualEnvironmentFailure,
    /// Error terminal: C5 dependency installation failed.
    PipInstallFailure,
}

impl ProcessState {
    /// True once the record cannot transition further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessState::NoProcfile
                | ProcessState::UnknownProcessType
                | ProcessState::DownloadFailure
                | ProcessState::VirtualEnvironmentFailure
                | ProcessState::PipInstallFailure
        )
    }

    /// True for terminal states reached by an actual error (as opposed to the
    /// two "this app simply has no such process type" terminals).
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ProcessState::DownloadFailure
                | ProcessState::VirtualEnvironmentFailure
                | ProcessState::PipInstallFailure
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Pending => "pending",
            ProcessState::Downloading => "downloading",
            ProcessState::Unpacking => "unpacking",
            ProcessState::Processing => "processing",
            ProcessState::Running => "running",
            ProcessState::NoProcfile => "no procfile",
            ProcessState::UnknownProcessType => "unknown process type",
            ProcessState::DownloadFailure => "download failure",
            ProcessState::VirtualEnvironmentFailure => "virtual environment failure",
            ProcessState::PipInstallFailure => "pip install failure",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Wire format is the exact display string, not the Rust variant name.
impl Serialize for ProcessState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A one-shot, idempotent control signal.
///
/// `fire` may be called any number of times; only the first call has an
/// effect, and a `wait` issued before or after `fire` observes it exactly
/// once it has happened (invariant 4 in the data model: firing before the
/// pipeline reaches its suspension point still causes a short-circuit at
/// that point, not a missed signal).
#[derive(Debug)]
pub struct StopSignal {
    fired: std::sync::atomic::AtomicBool,
    notify: tokio::sync::Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            fired: std::sync::atomic::AtomicBool::new(false),
            notify: tokio::sync::Notify::new(),
        }
    }

    /// Idempotent: firing twice has the same effect as firing once.
    pub fn fire(&self) {
        if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Suspend until the signal fires. Returns immediately if it already has.
    ///
    /// The `notified()` future is constructed before the flag check so a
    /// `fire()` racing with this call can never be missed: `Notified`
    /// enrolls as a waiter at construction time, not at `.await` time.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_fired() {
            return;
        }
        notified.await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
