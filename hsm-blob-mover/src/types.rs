/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// The block size used to split file content for upload or download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PartSize {
    /// Use the default block size (8 MiB).
    #[default]
    Auto,

    /// Block size explicitly given in bytes.
    Target(u64),
}

/// The number of concurrent block transfers a single operation may run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConcurrencySetting {
    /// Use the default parallelism.
    #[default]
    Auto,

    /// Explicitly configured number of workers.
    Explicit(usize),
}

/// How the target container models directories and permissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamespaceMode {
    /// Flat blob namespace. Directories are simulated with placeholder blobs and
    /// ownership/permissions travel as blob metadata.
    #[default]
    Flat,

    /// Hierarchical namespace. Ownership and permissions are written as native ACLs
    /// through the namespace-aware endpoint.
    Hierarchical,
}

impl NamespaceMode {
    /// Returns true when ACLs are written through the namespace-aware endpoint
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, NamespaceMode::Hierarchical)
    }
}

/// Receives incremental byte progress while content is transferred.
///
/// Calls may arrive concurrently and out of order from different workers.
pub trait ProgressListener: Send + Sync + fmt::Debug {
    /// `length` bytes starting at `offset` have been transferred.
    fn on_progress(&self, offset: u64, length: u64);
}
