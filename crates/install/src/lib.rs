#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package installation for bridge
//!
//! One [`Installer::install`] call is one transaction: the archive is
//! fetched into scratch space, extracted, its package root located, and the
//! root swapped into the live slot with a backup that is restored if the
//! swap cannot complete.

pub mod extract;
pub mod fs;
pub mod locator;
mod transaction;

pub use extract::ArchiveFormat;
pub use fs::{LocalFilesystem, SlotFilesystem};
pub use locator::{locate_root, ManifestSignature};
pub use transaction::{InstallOutcome, InstallPaths, Installer};
