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

/// Input type for restoring an archived object
#[non_exhaustive]
#[derive(Clone)]
pub struct RestoreInput {
    /// Name of the file relative to the mount root
    pub object_name: String,

    /// Where to write content, when it differs from `<mount root>/<object name>`
    pub destination: Option<PathBuf>,

    /// Cancels the restore when fired
    pub cancellation_token: CancellationToken,

    /// Receives byte progress while content is downloaded
    pub progress_listener: Option<Arc<dyn ProgressListener>>,
}

impl RestoreInput {
    /// Creates a new builder-style object to manufacture [`RestoreInput`]
    pub fn builder() -> RestoreInputBuilder {
        RestoreInputBuilder::default()
    }

    /// Name of the file relative to the mount root
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Explicit destination, if any
    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}

impl fmt::Debug for RestoreInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatter = f.debug_struct("RestoreInput");
        formatter.field("object_name", &self.object_name);
        formatter.field("destination", &self.destination);
        formatter.field("cancelled", &self.cancellation_token.is_cancelled());
        formatter.field("progress_listener", &self.progress_listener.is_some());
        formatter.finish()
    }
}

/// A builder for [`RestoreInput`]
#[non_exhaustive]
#[derive(Clone, Default, Debug)]
pub struct RestoreInputBuilder {
    pub(crate) object_name: Option<String>,
    pub(crate) destination: Option<PathBuf>,
    pub(crate) cancellation_token: Option<CancellationToken>,
    pub(crate) progress_listener: Option<Arc<dyn ProgressListener>>,
}

impl RestoreInputBuilder {
    /// Name of the file relative to the mount root.
    ///
    /// NOTE: An object name is required.
    pub fn object_name(mut self, input: impl Into<String>) -> Self {
        self.object_name = Some(input.into());
        self
    }

    /// Name of the file relative to the mount root.
    pub fn get_object_name(&self) -> &Option<String> {
        &self.object_name
    }

    /// Write content to this path instead of `<mount root>/<object name>`
    pub fn destination(mut self, input: impl Into<PathBuf>) -> Self {
        self.destination = Some(input.into());
        self
    }

    /// Write content to this path instead of `<mount root>/<object name>`
    pub fn get_destination(&self) -> &Option<PathBuf> {
        &self.destination
    }

    /// Token used to cancel the restore
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.cancellation_token = Some(input);
        self
    }

    /// Listener receiving byte progress
    pub fn progress_listener(mut self, input: Arc<dyn ProgressListener>) -> Self {
        self.progress_listener = Some(input);
        self
    }

    /// Consumes the builder and constructs a [`RestoreInput`]
    pub fn build(self) -> Result<RestoreInput, Error> {
        Ok(RestoreInput {
            object_name: self
                .object_name
                .ok_or_else(|| error::invalid_input("object name is required"))?,
            destination: self.destination,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            progress_listener: self.progress_listener,
        })
    }
}
