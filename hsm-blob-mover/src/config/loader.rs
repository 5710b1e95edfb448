/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::str::FromStr;

use crate::config::Builder;
use crate::error::{self, Error};
use crate::metrics::{unit::ByteUnit, Throughput};
use crate::runtime::pacer::Pacer;
use crate::types::{ConcurrencySetting, NamespaceMode, PartSize};
use crate::Config;

const ENV_ACCOUNT: &str = "HSM_AZ_ACCOUNT";
const ENV_CONTAINER: &str = "HSM_AZ_CONTAINER";
const ENV_SAS: &str = "HSM_AZ_SAS";
const ENV_EXPORT_PREFIX: &str = "HSM_AZ_EXPORT_PREFIX";
const ENV_MOUNT_ROOT: &str = "HSM_MOUNT_ROOT";
const ENV_PARALLELISM: &str = "HSM_AZ_PARALLELISM";
const ENV_BLOCK_SIZE: &str = "HSM_AZ_BLOCK_SIZE";
const ENV_BANDWIDTH_MBPS: &str = "HSM_AZ_BANDWIDTH_MBPS";
const ENV_HNS: &str = "HSM_AZ_HNS";

/// Load mover [`Config`] from the environment.
///
/// Values set on the loader take precedence over the environment.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
}

impl ConfigLoader {
    /// Storage account name (overrides `HSM_AZ_ACCOUNT`)
    pub fn account_name(mut self, account_name: impl Into<String>) -> Self {
        self.builder = self.builder.account_name(account_name);
        self
    }

    /// Container name (overrides `HSM_AZ_CONTAINER`)
    pub fn container_name(mut self, container_name: impl Into<String>) -> Self {
        self.builder = self.builder.container_name(container_name);
        self
    }

    /// Export prefix (overrides `HSM_AZ_EXPORT_PREFIX`)
    pub fn export_prefix(mut self, export_prefix: impl Into<String>) -> Self {
        self.builder = self.builder.export_prefix(export_prefix);
        self
    }

    /// Mount root (overrides `HSM_MOUNT_ROOT`)
    pub fn mount_root(mut self, mount_root: impl Into<std::path::PathBuf>) -> Self {
        self.builder = self.builder.mount_root(mount_root);
        self
    }

    /// Parallelism (overrides `HSM_AZ_PARALLELISM`)
    pub fn parallelism(mut self, parallelism: ConcurrencySetting) -> Self {
        self.builder = self.builder.parallelism(parallelism);
        self
    }

    /// Block size (overrides `HSM_AZ_BLOCK_SIZE`)
    pub fn block_size(mut self, block_size: PartSize) -> Self {
        self.builder = self.builder.block_size(block_size);
        self
    }

    /// Share an existing rate limiter (overrides `HSM_AZ_BANDWIDTH_MBPS`)
    pub fn pacer(mut self, pacer: Pacer) -> Self {
        self.builder = self.builder.pacer(pacer);
        self
    }

    /// Namespace mode (overrides `HSM_AZ_HNS`)
    pub fn namespace_mode(mut self, namespace_mode: NamespaceMode) -> Self {
        self.builder = self.builder.namespace_mode(namespace_mode);
        self
    }

    /// Load the configuration from the process environment
    ///
    /// If fields have been overridden on the loader, the override values will be used.
    /// Otherwise the environment value, and failing that the default, is used.
    pub fn load(self) -> Result<Config, Error> {
        self.load_with(|key| std::env::var(key).ok())
    }

    pub(crate) fn load_with<F>(self, lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = from_lookup(&lookup)?;
        let overrides = self.builder;

        let merged = Builder {
            account_name: overrides.account_name.or(env.account_name),
            container_name: overrides.container_name.or(env.container_name),
            sas_token: overrides.sas_token.or(env.sas_token),
            export_prefix: overrides.export_prefix.or(env.export_prefix),
            mount_root: overrides.mount_root.or(env.mount_root),
            parallelism: prefer(overrides.parallelism, env.parallelism),
            block_size: prefer(overrides.block_size, env.block_size),
            pacer: overrides.pacer.or(env.pacer),
            namespace_mode: prefer(overrides.namespace_mode, env.namespace_mode),
            flat_endpoint: overrides.flat_endpoint.or(env.flat_endpoint),
            namespace_endpoint: overrides.namespace_endpoint.or(env.namespace_endpoint),
        };
        merged.build()
    }
}

fn prefer<T: Default + PartialEq>(explicit: T, env: T) -> T {
    if explicit != T::default() {
        explicit
    } else {
        env
    }
}

fn from_lookup<F>(lookup: &F) -> Result<Builder, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Builder::default();
    if let Some(account) = lookup(ENV_ACCOUNT) {
        builder = builder.account_name(account);
    }
    if let Some(container) = lookup(ENV_CONTAINER) {
        builder = builder.container_name(container);
    }
    if let Some(sas) = lookup(ENV_SAS) {
        builder = builder.sas_token(sas);
    }
    if let Some(prefix) = lookup(ENV_EXPORT_PREFIX) {
        builder = builder.export_prefix(prefix);
    }
    if let Some(root) = lookup(ENV_MOUNT_ROOT) {
        builder = builder.mount_root(root);
    }
    if let Some(value) = lookup(ENV_PARALLELISM) {
        let workers = value.trim().parse::<usize>().map_err(|err| {
            error::invalid_input(format!("{ENV_PARALLELISM}='{value}': {err}"))
        })?;
        builder = builder.parallelism(ConcurrencySetting::Explicit(workers));
    }
    if let Some(value) = lookup(ENV_BLOCK_SIZE) {
        builder = builder.block_size(PartSize::Target(parse_byte_size(&value)?));
    }
    if let Some(value) = lookup(ENV_BANDWIDTH_MBPS) {
        let mbps = value.trim().parse::<u64>().map_err(|err| {
            error::invalid_input(format!("{ENV_BANDWIDTH_MBPS}='{value}': {err}"))
        })?;
        // zero means unlimited
        if mbps > 0 {
            let bytes_per_sec = mbps
                .checked_mul(ByteUnit::Megabit.as_bytes_u64())
                .ok_or_else(|| {
                    error::invalid_input(format!("{ENV_BANDWIDTH_MBPS}='{value}' is out of range"))
                })?;
            builder = builder.rate_limit(Throughput::new_bytes_per_sec(bytes_per_sec));
        }
    }
    if let Some(value) = lookup(ENV_HNS) {
        let mode = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => NamespaceMode::Hierarchical,
            "0" | "false" | "no" | "" => NamespaceMode::Flat,
            _ => {
                return Err(error::invalid_input(format!(
                    "{ENV_HNS}='{value}' is not a boolean"
                )))
            }
        };
        builder = builder.namespace_mode(mode);
    }
    Ok(builder)
}

/// Parse sizes such as `4194304`, `8MiB` or `1 GiB`
pub(crate) fn parse_byte_size(value: &str) -> Result<u64, Error> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (count, unit) = value.split_at(split);
    let count = count
        .parse::<u64>()
        .map_err(|err| error::invalid_input(format!("invalid size '{value}': {err}")))?;
    let unit = match unit.trim() {
        "" => ByteUnit::Byte,
        unit => ByteUnit::from_str(unit)?,
    };
    count
        .checked_mul(unit.as_bytes_u64())
        .ok_or_else(|| error::invalid_input(format!("size '{value}' overflows")))
}
