//! The deploy pipeline's worker steps: fetch an archive, unpack it, read
//! its manifest, provision an isolated runtime, and supervise the
//! resulting process.

pub mod extract;
pub mod fetch;
pub mod manifest;
pub mod provision;
pub mod supervisor;

pub use fetch::{default_accept, fetch as fetch_archive};
