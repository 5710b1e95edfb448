/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use path_clean::PathClean;
use reqwest::Url;
use std::path::Path;

use crate::error::{self, Error};
use crate::Config;

/// Host suffix of the flat blob endpoint
pub const FLAT_SERVICE_SUFFIX: &str = "blob.core.windows.net";

/// Host suffix of the hierarchical-namespace (Data Lake) endpoint
pub const NAMESPACE_SERVICE_SUFFIX: &str = "dfs.core.windows.net";

/// Normalize and join path components into a container-relative blob key.
///
/// Backslashes are treated as separators, empty and `.` segments are dropped and `..`
/// segments are resolved. Keys that would escape the container are rejected. Normalizing an
/// already normalized key returns it unchanged.
pub fn normalize_key<'a, I>(parts: I) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = parts
        .into_iter()
        .map(|p| p.replace('\\', "/"))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    // anchor at a virtual root so `..` can never climb above the container
    let anchored = format!("/{joined}");
    let cleaned = Path::new(&anchored).clean();
    let cleaned = cleaned.to_string_lossy().replace('\\', "/");

    let escapes = joined.split('/').try_fold(0usize, |depth, seg| match seg {
        ".." => depth.checked_sub(1),
        "." | "" => Some(depth),
        _ => Some(depth + 1),
    });
    if escapes.is_none() {
        return Err(error::invalid_input(format!(
            "'{joined}' escapes the container root"
        )));
    }

    Ok(cleaned.trim_start_matches('/').to_owned())
}

/// The two protocol views of one blob: the flat blob endpoint and the namespace-aware endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    key: String,
    flat_url: Url,
    namespace_url: Url,
}

impl BlobLocation {
    /// The container-relative key (export prefix included)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Address of the blob on the flat blob endpoint, including the access token
    pub fn flat_url(&self) -> &Url {
        &self.flat_url
    }

    /// Address of the same blob on the namespace-aware endpoint, including the access token
    pub fn namespace_url(&self) -> &Url {
        &self.namespace_url
    }
}

/// Maps filesystem-relative object names to blob addresses for one container and export prefix.
#[derive(Debug, Clone)]
pub struct PathMapper {
    container: String,
    export_prefix: String,
    sas_token: Option<String>,
    flat_base: Url,
    namespace_base: Url,
}

impl PathMapper {
    /// Create a mapper for the container, prefix and endpoints in `config`
    pub fn new(config: &Config) -> Result<Self, Error> {
        let flat_base = match config.flat_endpoint() {
            Some(url) => url.clone(),
            None => account_endpoint(config.account_name(), FLAT_SERVICE_SUFFIX)?,
        };
        let namespace_base = match config.namespace_endpoint() {
            Some(url) => url.clone(),
            None => account_endpoint(config.account_name(), NAMESPACE_SERVICE_SUFFIX)?,
        };
        for base in [&flat_base, &namespace_base] {
            if base.cannot_be_a_base() {
                return Err(error::invalid_input(format!(
                    "endpoint '{base}' cannot carry a path"
                )));
            }
        }

        Ok(Self {
            container: config.container_name().to_owned(),
            export_prefix: normalize_key([config.export_prefix()])?,
            sas_token: config
                .sas_token()
                .map(|t| t.trim_start_matches('?').to_owned())
                .filter(|t| !t.is_empty()),
            flat_base,
            namespace_base,
        })
    }

    /// Normalized export prefix all keys are placed under
    pub fn export_prefix(&self) -> &str {
        &self.export_prefix
    }

    /// Blob key for `object_name`: the export prefix joined with the normalized object name
    pub fn object_key(&self, object_name: &str) -> Result<String, Error> {
        let name = normalize_key([object_name])?;
        if name.is_empty() {
            return Err(error::invalid_input(format!(
                "object name '{object_name}' does not name a file"
            )));
        }
        normalize_key([self.export_prefix.as_str(), name.as_str()])
    }

    /// Resolve `object_name` to both endpoint addresses
    pub fn locate(&self, object_name: &str) -> Result<BlobLocation, Error> {
        let key = self.object_key(object_name)?;
        Ok(BlobLocation {
            flat_url: self.url_for(&self.flat_base, &key)?,
            namespace_url: self.url_for(&self.namespace_base, &key)?,
            key,
        })
    }

    fn url_for(&self, base: &Url, key: &str) -> Result<Url, Error> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| error::invalid_input(format!("endpoint '{base}' cannot carry a path")))?
            .pop_if_empty()
            .push(&self.container)
            .extend(key.split('/'));
        url.set_query(self.sas_token.as_deref());
        Ok(url)
    }
}

/// Ancestor directories of `object_name`, shallowest first.
///
/// `a/b/file.txt` yields `["a", "a/b"]`; a name without separators has no ancestors.
pub fn ancestors(object_name: &str) -> Result<Vec<String>, Error> {
    let name = normalize_key([object_name])?;
    let segments = name.split('/').collect::<Vec<_>>();
    let mut dirs = Vec::with_capacity(segments.len().saturating_sub(1));
    let mut current = String::new();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        dirs.push(current.clone());
    }
    Ok(dirs)
}

fn account_endpoint(account: &str, suffix: &str) -> Result<Url, Error> {
    Url::parse(&format!("https://{account}.{suffix}"))
        .map_err(|err| error::invalid_input(format!("invalid account name '{account}': {err}")))
}
