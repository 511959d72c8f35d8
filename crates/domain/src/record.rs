use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::state::{ProcessState, StopSignal};

/// `"{app}.{node}"`, the registry's unique key and the identity of every
/// on-disk artifact belonging to a deployed process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(app: &str, node: &str) -> Self {
        Self(format!("{app}.{node}"))
    }

    /// Reconstruct a `Slug` from its wire form (an HTTP path segment),
    /// without re-deriving it from separate `app`/`node` parts.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three sibling directories every slug owns a subpath under.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn envs_dir(&self) -> PathBuf {
        self.root.join("envs")
    }

    /// The raw archive file the fetcher writes for `slug`.
    pub fn archive_path(&self, slug: &Slug) -> PathBuf {
        self.archives_dir().join(slug.as_str())
    }

    /// The directory the extractor unpacks `slug`'s archive into.
    pub fn source_path(&self, slug: &Slug) -> PathBuf {
        self.sources_dir().join(slug.as_str())
    }

    /// The directory the provisioner roots `slug`'s isolated runtime at.
    pub fn env_path(&self, slug: &Slug) -> PathBuf {
        self.envs_dir().join(slug.as_str())
    }
}

/// The central entity: everything known about one deployed process.
///
/// `state` is written exclusively by the pipeline task that owns this
/// record (invariant 2); HTTP handlers only ever read it.
pub struct ProcessRecord {
    pub slug: Slug,
    pub app: String,
    pub node: String,
    pub source_url: String,
    pub process_type: String,
    pub env: HashMap<String, String>,
    pub state: parking_lot_state::StateCell,
    pub stop_signal: StopSignal,
    /// Set once the pipeline task has been spawned; awaited by DELETE.
    pub pipeline_handle: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ProcessRecord {
    pub fn new(app: String, node: String, source_url: String, process_type: String, env: HashMap<String, String>) -> Self {
        let slug = Slug::new(&app, &node);
        Self {
            slug,
            app,
            node,
            source_url,
            process_type,
            env,
            state: parking_lot_state::StateCell::new(ProcessState::Pending),
            stop_signal: StopSignal::new(),
            pipeline_handle: parking_lot::Mutex::new(None),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state.get()
    }

    /// The only sanctioned state mutator; callers outside the owning
    /// pipeline task must not call this (invariant 2).
    pub fn set_state(&self, state: ProcessState) {
        self.state.set(state);
    }
}

/// A tiny named module instead of a bare `parking_lot::Mutex<ProcessState>`
/// field so the "only the pipeline writes this" invariant has a single,
/// greppable chokepoint (`StateCell::set`) rather than being spread across
/// every call site that happens to hold a `&ProcessRecord`.
mod parking_lot_state {
    use parking_lot::RwLock;

    use crate::state::ProcessState;

    pub struct StateCell(RwLock<ProcessState>);

    impl StateCell {
        pub fn new(initial: ProcessState) -> Self {
            Self(RwLock::new(initial))
        }

        pub fn get(&self) -> ProcessState {
            *self.0.read()
        }

        pub fn set(&self, state: ProcessState) {
            *self.0.write() = state;
        }
    }
}
