/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::types::ProgressListener;

use super::{ArchiveInputBuilder, ArchiveOutput};

/// Fluent builder for constructing a single file archive
#[derive(Debug)]
pub struct ArchiveFluentBuilder {
    handle: Arc<crate::client::Handle>,
    inner: ArchiveInputBuilder,
}

impl ArchiveFluentBuilder {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        Self {
            handle,
            inner: ::std::default::Default::default(),
        }
    }

    /// Archive the file and wait for it to complete
    pub async fn send(self) -> Result<ArchiveOutput, Error> {
        let input = self.inner.build()?;
        crate::operation::archive::Archive::orchestrate(self.handle, input).await
    }

    /// Name of the file relative to the mount root.
    pub fn object_name(mut self, input: impl Into<String>) -> Self {
        self.inner = self.inner.object_name(input);
        self
    }

    /// Name of the file relative to the mount root.
    pub fn get_object_name(&self) -> &Option<String> {
        self.inner.get_object_name()
    }

    /// Read content from this path instead of `<mount root>/<object name>`
    pub fn source_path(mut self, input: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.source_path(input);
        self
    }

    /// Token used to cancel the archive
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.inner = self.inner.cancellation_token(input);
        self
    }

    /// Listener receiving byte progress
    pub fn progress_listener(mut self, input: Arc<dyn ProgressListener>) -> Self {
        self.inner = self.inner.progress_listener(input);
        self
    }
}

impl ArchiveInputBuilder {
    /// Archive with this input using the given client.
    pub async fn send_with(self, client: &crate::Client) -> Result<ArchiveOutput, Error> {
        let mut fluent_builder = client.archive();
        fluent_builder.inner = self;
        fluent_builder.send().await
    }
}
