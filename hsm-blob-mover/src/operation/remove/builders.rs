/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Error;

use super::{RemoveInputBuilder, RemoveOutput};

/// Fluent builder for removing an archived object
#[derive(Debug)]
pub struct RemoveFluentBuilder {
    handle: Arc<crate::client::Handle>,
    inner: RemoveInputBuilder,
}

impl RemoveFluentBuilder {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        Self {
            handle,
            inner: ::std::default::Default::default(),
        }
    }

    /// Issue the delete and wait for it to complete
    pub async fn send(self) -> Result<RemoveOutput, Error> {
        let input = self.inner.build()?;
        crate::operation::remove::Remove::orchestrate(self.handle, input).await
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

    /// Token used to cancel the request
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.inner = self.inner.cancellation_token(input);
        self
    }
}

impl RemoveInputBuilder {
    /// Remove with this input using the given client.
    pub async fn send_with(self, client: &crate::Client) -> Result<RemoveOutput, Error> {
        let mut fluent_builder = client.remove();
        fluent_builder.inner = self;
        fluent_builder.send().await
    }
}
