/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Hierarchical storage management data mover for Azure Blob Storage.
//!
//! Files living under a POSIX mount are archived into a blob container (flat or
//! hierarchical-namespace), restored back, or removed from the container. Archiving a file
//! first replicates each ancestor directory as a zero-length placeholder blob carrying the
//! directory's ownership, mode and modification time, then uploads the file content as
//! concurrently staged blocks under a process-wide [`Pacer`](runtime::pacer::Pacer).
//!
//! # Examples
//!
//! Archive a single file:
//!
//! ```no_run
//! # async fn example() -> Result<(), hsm_blob_mover::error::Error> {
//! let config = hsm_blob_mover::from_env().load()?;
//! let client = hsm_blob_mover::Client::new(config)?;
//!
//! let output = client
//!     .archive()
//!     .object_name("projects/alpha/results.dat")
//!     .send()
//!     .await?;
//!
//! println!("archived {} bytes", output.bytes_transferred());
//! # Ok(())
//! # }
//! ```
//!
//! Movers are normally driven by a coordinator through [`mover::plugin::Plugin`], which routes
//! archive, restore, remove and cancel requests to the [`mover::Mover`] registered for the
//! request's archive ID.

/// Default number of concurrent block transfers per operation
pub(crate) const DEFAULT_CONCURRENCY: usize = 8;

/// Error types emitted by `hsm-blob-mover`
pub mod error;

/// Common types used by `hsm-blob-mover`
pub mod types;

/// Types and helpers for I/O
pub(crate) mod io;

/// Mapping of filesystem object names to blob addresses
pub mod path;

/// Filesystem metadata preserved alongside archived blobs
pub mod metadata;

/// Object store backends
pub mod store;

/// Mover client
pub mod client;

/// Mover operations
pub mod operation;

/// Mover configuration
pub mod config;

/// Coordinator-facing mover contract
pub mod mover;

/// Internal runtime components
pub mod runtime;

/// Units and throughput measurements
pub mod metrics;

pub use self::client::Client;
use self::config::loader::ConfigLoader;
pub use self::config::Config;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
