/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};
use crate::types::ProgressListener;

/// Input type for archiving a single file
#[non_exhaustive]
#[derive(Clone)]
pub struct ArchiveInput {
    /// Name of the file relative to the mount root, e.g. `a/b/file.txt`
    pub object_name: String,

    /// Where to read content from, when it differs from `<mount root>/<object name>`
    pub source_path: Option<PathBuf>,

    /// Cancels the archive when fired
    pub cancellation_token: CancellationToken,

    /// Receives byte progress while content is uploaded
    pub progress_listener: Option<Arc<dyn ProgressListener>>,
}

impl ArchiveInput {
    /// Creates a new builder-style object to manufacture [`ArchiveInput`]
    pub fn builder() -> ArchiveInputBuilder {
        ArchiveInputBuilder::default()
    }

    /// Name of the file relative to the mount root
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Explicit content source, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Cancels the archive when fired
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }
}

impl fmt::Debug for ArchiveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = f.debug_struct("ArchiveInput");
        formatter.field("object_name", &self.object_name);
        formatter.field("source_path", &self.source_path);
        formatter.field("cancelled", &self.cancellation_token.is_cancelled());
        formatter.field("progress_listener", &self.progress_listener.is_some());
        formatter.finish()
    }
}

/// A builder for [`ArchiveInput`]
#[non_exhaustive]
#[derive(Clone, Default, Debug)]
pub struct ArchiveInputBuilder {
    pub(crate) object_name: Option<String>,
    pub(crate) source_path: Option<PathBuf>,
    pub(crate) cancellation_token: Option<CancellationToken>,
    pub(crate) progress_listener: Option<Arc<dyn ProgressListener>>,
}

impl ArchiveInputBuilder {
    /// Name of the file relative to the mount root.
    ///
    /// NOTE: An object name is required.
    pub fn object_name(mut self, input: impl Into<String>) -> Self {
        self.object_name = Some(input.into());
        self
    }

    /// Name of the file relative to the mount root.
    pub fn set_object_name(mut self, input: Option<String>) -> Self {
        self.object_name = input;
        self
    }

    /// Name of the file relative to the mount root.
    pub fn get_object_name(&self) -> &Option<String> {
        &self.object_name
    }

    /// Read content from this path instead of `<mount root>/<object name>`
    pub fn source_path(mut self, input: impl Into<PathBuf>) -> Self {
        self.source_path = Some(input.into());
        self
    }

    /// Read content from this path instead of `<mount root>/<object name>`
    pub fn set_source_path(mut self, input: Option<PathBuf>) -> Self {
        self.source_path = input;
        self
    }

    /// Explicit content source, if any
    pub fn get_source_path(&self) -> &Option<PathBuf> {
        &self.source_path
    }

    /// Token used to cancel the archive
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.cancellation_token = Some(input);
        self
    }

    /// Listener receiving byte progress
    pub fn progress_listener(mut self, input: Arc<dyn ProgressListener>) -> Self {
        self.progress_listener = Some(input);
        self
    }

    /// Consumes the builder and constructs an [`ArchiveInput`]
    pub fn build(self) -> Result<ArchiveInput, Error> {
        let object_name = self
            .object_name
            .ok_or_else(|| error::invalid_input("object name is required"))?;
        Ok(ArchiveInput {
            object_name,
            source_path: self.source_path,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            progress_listener: self.progress_listener,
        })
    }
}
