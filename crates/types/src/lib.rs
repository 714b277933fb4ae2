#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the bridge update agent
//!
//! This crate provides the package descriptor, the wire shapes exchanged
//! with the remote authority, and small helpers shared by the pipeline crates.

pub mod descriptor;
pub mod interval;
pub mod remote;
pub mod stage;

pub use descriptor::{checked_slug, sanitize_slug, PackageDescriptor, DEFAULT_BRANCH};
pub use interval::PollInterval;
pub use remote::{RemotePackage, RemoteStatus};
pub use stage::InstallStage;
pub use secrecy::{ExposeSecret, SecretString};

/// Build a collision-resistant scratch entry name.
///
/// Combines the current Unix timestamp with a random token so that two
/// transactions started within the same second never share a path.
#[must_use]
pub fn scratch_name(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        chrono::Utc::now().timestamp(),
        rand::random::<u32>()
    )
}
