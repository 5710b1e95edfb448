/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::Error;

/// Output type for archiving a single file
#[non_exhaustive]
#[derive(Debug)]
pub struct ArchiveOutput {
    /// Number of content bytes uploaded
    pub bytes_transferred: u64,

    /// Key of the content blob
    pub object_key: String,

    /// Keys of the directory placeholders written, shallowest first
    pub placeholders: Vec<String>,

    /// Failure of the post-upload ACL step, if it failed.
    ///
    /// The content is committed either way.
    pub acl_degradation: Option<Error>,
}

impl ArchiveOutput {
    /// Number of content bytes uploaded
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Key of the content blob
    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    /// Keys of the directory placeholders written, shallowest first
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// The error from re-applying the ACL after upload, if any
    pub fn acl_degradation(&self) -> Option<&Error> {
        self.acl_degradation.as_ref()
    }

    /// Returns true when the content was archived but its ACL was not applied
    pub fn is_degraded(&self) -> bool {
        self.acl_degradation.is_some()
    }
}
