/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};

/// Input type for removing an archived object
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct RemoveInput {
    /// Name of the file relative to the mount root
    pub object_name: String,

    /// Cancels the request when fired
    pub cancellation_token: CancellationToken,
}

impl RemoveInput {
    /// Creates a new builder-style object to manufacture [`RemoveInput`]
    pub fn builder() -> RemoveInputBuilder {
        RemoveInputBuilder::default()
    }

    /// Name of the file relative to the mount root
    pub fn object_name(&self) -> &str {
        &self.object_name
    }
}

/// A builder for [`RemoveInput`]
#[non_exhaustive]
#[derive(Clone, Default, Debug)]
pub struct RemoveInputBuilder {
    pub(crate) object_name: Option<String>,
    pub(crate) cancellation_token: Option<CancellationToken>,
}

impl RemoveInputBuilder {
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

    /// Token used to cancel the request
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.cancellation_token = Some(input);
        self
    }

    /// Consumes the builder and constructs a [`RemoveInput`]
    pub fn build(self) -> Result<RemoveInput, Error> {
        Ok(RemoveInput {
            object_name: self
                .object_name
                .ok_or_else(|| error::invalid_input("object name is required"))?,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
