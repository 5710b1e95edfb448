/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use reqwest::Url;
use std::path::{Path, PathBuf};

use crate::error::{self, Error};
use crate::metrics::{unit::ByteUnit, Throughput};
use crate::runtime::pacer::Pacer;
use crate::types::{ConcurrencySetting, NamespaceMode, PartSize};
use crate::DEFAULT_CONCURRENCY;

/// Environment based configuration loading
pub mod loader;

/// Default block size used when [`PartSize::Auto`] is configured
pub(crate) const DEFAULT_BLOCK_SIZE_BYTES: u64 = 8 * ByteUnit::Mebibyte.as_bytes_u64();

/// Configuration for a [`Client`](crate::client::Client)
///
/// A `Config` is immutable once built. Clones share the same [`Pacer`], so every client built
/// from clones of one config draws from the same throughput budget.
#[derive(Debug, Clone)]
pub struct Config {
    account_name: String,
    container_name: String,
    sas_token: Option<String>,
    export_prefix: String,
    mount_root: PathBuf,
    parallelism: ConcurrencySetting,
    block_size: PartSize,
    pacer: Pacer,
    namespace_mode: NamespaceMode,
    flat_endpoint: Option<Url>,
    namespace_endpoint: Option<Url>,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Storage account name
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Container all objects are stored in
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Shared access signature appended to every request, if any
    pub fn sas_token(&self) -> Option<&str> {
        self.sas_token.as_deref()
    }

    /// Logical sub-path under which all objects for this mover live
    pub fn export_prefix(&self) -> &str {
        &self.export_prefix
    }

    /// Root of the mounted filesystem that object names are relative to
    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Returns the parallelism setting for block transfers within one operation
    pub fn parallelism(&self) -> &ConcurrencySetting {
        &self.parallelism
    }

    /// Returns the block size setting
    pub fn block_size(&self) -> &PartSize {
        &self.block_size
    }

    /// The process-wide rate limiter
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Whether the container has a hierarchical namespace
    pub fn namespace_mode(&self) -> NamespaceMode {
        self.namespace_mode
    }

    /// Override for the flat blob endpoint
    pub fn flat_endpoint(&self) -> Option<&Url> {
        self.flat_endpoint.as_ref()
    }

    /// Override for the namespace-aware endpoint
    pub fn namespace_endpoint(&self) -> Option<&Url> {
        self.namespace_endpoint.as_ref()
    }

    /// Concrete number of workers to use for a single transfer
    pub(crate) fn num_workers(&self) -> usize {
        match self.parallelism {
            ConcurrencySetting::Explicit(workers) => workers,
            ConcurrencySetting::Auto => DEFAULT_CONCURRENCY,
        }
    }

    /// Concrete block size in bytes
    pub(crate) fn block_size_bytes(&self) -> u64 {
        match self.block_size {
            PartSize::Target(explicit) => explicit,
            PartSize::Auto => DEFAULT_BLOCK_SIZE_BYTES,
        }
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) account_name: Option<String>,
    pub(crate) container_name: Option<String>,
    pub(crate) sas_token: Option<String>,
    pub(crate) export_prefix: Option<String>,
    pub(crate) mount_root: Option<PathBuf>,
    pub(crate) parallelism: ConcurrencySetting,
    pub(crate) block_size: PartSize,
    pub(crate) pacer: Option<Pacer>,
    pub(crate) namespace_mode: NamespaceMode,
    pub(crate) flat_endpoint: Option<Url>,
    pub(crate) namespace_endpoint: Option<Url>,
}

impl Builder {
    /// Storage account name (required)
    pub fn account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    /// Container name (required)
    pub fn container_name(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = Some(container_name.into());
        self
    }

    /// Shared access signature. A leading `?` is accepted.
    pub fn sas_token(mut self, sas_token: impl Into<String>) -> Self {
        self.sas_token = Some(sas_token.into());
        self
    }

    /// Logical sub-path under which all objects are stored
    pub fn export_prefix(mut self, export_prefix: impl Into<String>) -> Self {
        self.export_prefix = Some(export_prefix.into());
        self
    }

    /// Root of the mounted filesystem. Default is `/`.
    pub fn mount_root(mut self, mount_root: impl Into<PathBuf>) -> Self {
        self.mount_root = Some(mount_root.into());
        self
    }

    /// Maximum number of concurrent block transfers per operation.
    ///
    /// Default is [ConcurrencySetting::Auto].
    pub fn parallelism(mut self, parallelism: ConcurrencySetting) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Block size used to split file content. Default is [PartSize::Auto].
    pub fn block_size(mut self, block_size: PartSize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Use an existing rate limiter, typically shared with other configs in the process.
    pub fn pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Limit aggregate throughput of every client built from this config.
    pub fn rate_limit(mut self, throughput: Throughput) -> Self {
        self.pacer = Some(Pacer::new(throughput));
        self
    }

    /// Select flat or hierarchical-namespace metadata handling
    pub fn namespace_mode(mut self, namespace_mode: NamespaceMode) -> Self {
        self.namespace_mode = namespace_mode;
        self
    }

    /// Override the flat blob endpoint (e.g. an emulator or sovereign cloud)
    pub fn flat_endpoint(mut self, endpoint: Url) -> Self {
        self.flat_endpoint = Some(endpoint);
        self
    }

    /// Override the namespace-aware endpoint
    pub fn namespace_endpoint(mut self, endpoint: Url) -> Self {
        self.namespace_endpoint = Some(endpoint);
        self
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Result<Config, Error> {
        let account_name = required("account name", self.account_name)?;
        let container_name = required("container name", self.container_name)?;
        if let ConcurrencySetting::Explicit(0) = self.parallelism {
            return Err(error::invalid_input("parallelism must be at least 1"));
        }
        if let PartSize::Target(0) = self.block_size {
            return Err(error::invalid_input("block size must be greater than zero"));
        }

        Ok(Config {
            account_name,
            container_name,
            sas_token: self.sas_token,
            export_prefix: self.export_prefix.unwrap_or_default(),
            mount_root: self.mount_root.unwrap_or_else(|| PathBuf::from("/")),
            parallelism: self.parallelism,
            block_size: self.block_size,
            pacer: self.pacer.unwrap_or_else(Pacer::unlimited),
            namespace_mode: self.namespace_mode,
            flat_endpoint: self.flat_endpoint,
            namespace_endpoint: self.namespace_endpoint,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(error::invalid_input(format!("{name} is required"))),
    }
}
