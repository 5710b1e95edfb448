/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};

use crate::error::{self, Error, ErrorKind};
use crate::path::BlobLocation;
use crate::store::BlobStore;
use crate::types::NamespaceMode;

/// Metadata key marking a zero-length blob as a directory placeholder
pub const IS_FOLDER_KEY: &str = "hdi_isfolder";

/// Metadata key holding the octal permission bits
pub const PERMISSIONS_KEY: &str = "Permissions";

/// Metadata key holding the modification time, see [`MOD_TIME_FORMAT`]
pub const MOD_TIME_KEY: &str = "ModTime";

/// Metadata key holding the decimal owner UID
pub const OWNER_KEY: &str = "Owner";

/// Metadata key holding the decimal group GID
pub const GROUP_KEY: &str = "Group";

/// `strftime` format of the [`MOD_TIME_KEY`] value, e.g. `2024-03-01 17:04:05 +0100`
pub const MOD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// User-defined key/value metadata attached to a blob
pub type Metadata = BTreeMap<String, String>;

/// POSIX ownership, mode and modification time of one filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    owner: u32,
    group: u32,
    permissions: u32,
    modified: DateTime<FixedOffset>,
    len: u64,
    is_dir: bool,
}

impl FileMetadata {
    /// Stat `path` and capture its ownership fields.
    ///
    /// Fails with [`MetadataUnavailable`](crate::error::ErrorKind::MetadataUnavailable) when the
    /// entry cannot be read or the platform does not expose POSIX ownership.
    pub async fn from_path(path: &Path) -> Result<Self, Error> {
        let meta = tokio::fs::metadata(path).await.map_err(|err| {
            error::metadata_unavailable(format!("cannot stat {}: {err}", path.display()))
        })?;
        Self::from_std(path, &meta)
    }

    #[cfg(unix)]
    fn from_std(path: &Path, meta: &std::fs::Metadata) -> Result<Self, Error> {
        use std::os::unix::fs::MetadataExt;

        let modified = meta.modified().map_err(|err| {
            error::metadata_unavailable(format!("no mtime for {}: {err}", path.display()))
        })?;
        Ok(Self {
            owner: meta.uid(),
            group: meta.gid(),
            permissions: meta.mode() & 0o7777,
            modified: DateTime::<Local>::from(modified).fixed_offset(),
            len: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    #[cfg(not(unix))]
    fn from_std(path: &Path, _meta: &std::fs::Metadata) -> Result<Self, Error> {
        Err(error::metadata_unavailable(format!(
            "{}: POSIX ownership is not available on this platform",
            path.display()
        )))
    }

    /// Numeric owner ID
    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// Numeric group ID
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Permission bits, including setuid/setgid/sticky
    pub fn permissions(&self) -> u32 {
        self.permissions
    }

    /// Last modification time in the local timezone
    pub fn modified(&self) -> &DateTime<FixedOffset> {
        &self.modified
    }

    /// Size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true for zero-length entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// The four generic metadata keys carried by blobs in flat mode
    pub fn to_generic(&self) -> Metadata {
        Metadata::from([
            (PERMISSIONS_KEY.to_owned(), format!("{:o}", self.permissions)),
            (
                MOD_TIME_KEY.to_owned(),
                self.modified.format(MOD_TIME_FORMAT).to_string(),
            ),
            (OWNER_KEY.to_owned(), self.owner.to_string()),
            (GROUP_KEY.to_owned(), self.group.to_string()),
        ])
    }
}

/// Native access control of a path on a hierarchical-namespace endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessControl {
    owner: String,
    group: String,
    acl: String,
}

impl AccessControl {
    /// Create a new descriptor
    pub fn new(owner: impl Into<String>, group: impl Into<String>, acl: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            group: group.into(),
            acl: acl.into(),
        }
    }

    /// Derive the short-form ACL (`user::rwx,group::r-x,other::---`) from POSIX fields
    pub fn from_metadata(meta: &FileMetadata) -> Self {
        let p = meta.permissions();
        Self {
            owner: meta.owner().to_string(),
            group: meta.group().to_string(),
            acl: format!(
                "user::{},group::{},other::{}",
                rwx(p >> 6),
                rwx(p >> 3),
                rwx(p)
            ),
        }
    }

    /// Owning user
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Owning group
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Serialized ACL entries
    pub fn acl(&self) -> &str {
        &self.acl
    }
}

fn rwx(bits: u32) -> String {
    [(0o4, 'r'), (0o2, 'w'), (0o1, 'x')]
        .iter()
        .map(|(mask, c)| if bits & mask != 0 { *c } else { '-' })
        .collect()
}

/// How the permission state of an entry is preserved in the store
///
/// Chosen once per entry from the configured [`NamespaceMode`]. The two representations are
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStrategy {
    /// Ownership, mode and mtime travel as blob metadata
    Generic(FileMetadata),
    /// Ownership and mode are written as a native ACL through the namespace-aware endpoint
    NativeAcl(AccessControl),
}

impl MetadataStrategy {
    /// Select the representation for `meta` under `mode`.
    ///
    /// In hierarchical mode the current ACL of `location` is fetched from the store. A path that
    /// does not exist yet is not an error; its ACL is derived from `meta` instead. Any other
    /// failure is [`BackendUnavailable`](crate::error::ErrorKind::BackendUnavailable).
    pub async fn resolve(
        mode: NamespaceMode,
        meta: &FileMetadata,
        store: &dyn BlobStore,
        location: &BlobLocation,
    ) -> Result<Self, Error> {
        if !mode.is_hierarchical() {
            return Ok(Self::Generic(meta.clone()));
        }
        match store.get_access_control(location).await {
            Ok(acl) => Ok(Self::NativeAcl(acl)),
            Err(err) if err.is_not_found() => {
                tracing::debug!(key = location.key(), "no ACL yet, deriving from mode bits");
                Ok(Self::NativeAcl(AccessControl::from_metadata(meta)))
            }
            Err(err) if err.kind() == &ErrorKind::BackendUnavailable => Err(err),
            Err(err) => Err(error::backend_unavailable(err)),
        }
    }

    /// Generic key/value metadata for this strategy, empty for [`MetadataStrategy::NativeAcl`]
    pub fn generic_metadata(&self) -> Metadata {
        match self {
            Self::Generic(meta) => meta.to_generic(),
            Self::NativeAcl(_) => Metadata::new(),
        }
    }

    /// The ACL to apply after the content write, if any
    pub fn access_control(&self) -> Option<&AccessControl> {
        match self {
            Self::Generic(_) => None,
            Self::NativeAcl(acl) => Some(acl),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use chrono::DateTime;

    use super::{
        AccessControl, FileMetadata, MetadataStrategy, GROUP_KEY, MOD_TIME_FORMAT, MOD_TIME_KEY,
        OWNER_KEY, PERMISSIONS_KEY,
    };
    use crate::error::ErrorKind;
    use crate::store::{in_memory::InMemoryBlobStore, BlobStore};
    use crate::types::NamespaceMode;
    use crate::Config;

    fn location(key: &str) -> crate::path::BlobLocation {
        let config = Config::builder()
            .account_name("acct")
            .container_name("c")
            .build()
            .unwrap();
        crate::path::PathMapper::new(&config)
            .unwrap()
            .locate(key)
            .unwrap()
    }

    #[tokio::test]
    async fn test_generic_metadata_matches_stat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        let meta = FileMetadata::from_path(&path).await.unwrap();
        assert_eq!(10, meta.len());
        assert!(!meta.is_dir());

        let generic = meta.to_generic();
        assert_eq!(4, generic.len());
        assert_eq!("640", generic[PERMISSIONS_KEY]);
        assert_eq!(meta.owner().to_string(), generic[OWNER_KEY]);
        assert_eq!(meta.group().to_string(), generic[GROUP_KEY]);

        let parsed = DateTime::parse_from_str(&generic[MOD_TIME_KEY], MOD_TIME_FORMAT).unwrap();
        assert_eq!(meta.modified().timestamp(), parsed.timestamp());
    }

    #[tokio::test]
    async fn test_missing_entry_is_metadata_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileMetadata::from_path(&dir.path().join("nope"))
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::MetadataUnavailable, err.kind());
    }

    #[tokio::test]
    async fn test_acl_from_mode_bits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o750)).unwrap();
        let meta = FileMetadata::from_path(dir.path()).await.unwrap();
        assert!(meta.is_dir());
        let acl = AccessControl::from_metadata(&meta);
        assert_eq!("user::rwx,group::r-x,other::---", acl.acl());
        assert_eq!(meta.owner().to_string(), acl.owner());
    }

    #[tokio::test]
    async fn test_resolve_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let meta = FileMetadata::from_path(dir.path()).await.unwrap();
        let store = InMemoryBlobStore::hierarchical();
        let loc = location("export1/a");

        let flat = MetadataStrategy::resolve(NamespaceMode::Flat, &meta, &store, &loc)
            .await
            .unwrap();
        assert_eq!(4, flat.generic_metadata().len());
        assert!(flat.access_control().is_none());

        // path absent: derived from mode bits
        let derived = MetadataStrategy::resolve(NamespaceMode::Hierarchical, &meta, &store, &loc)
            .await
            .unwrap();
        assert!(derived.generic_metadata().is_empty());
        assert_eq!(
            &AccessControl::from_metadata(&meta),
            derived.access_control().unwrap()
        );

        // path present: store ACL wins
        let existing = AccessControl::new("1000", "1000", "user::rw-,group::---,other::---");
        store
            .put_blob(&loc, bytes::Bytes::new(), &Default::default())
            .await
            .unwrap();
        store.set_access_control(&loc, &existing).await.unwrap();
        let fetched = MetadataStrategy::resolve(NamespaceMode::Hierarchical, &meta, &store, &loc)
            .await
            .unwrap();
        assert_eq!(Some(&existing), fetched.access_control());
    }

    #[tokio::test]
    async fn test_resolve_backend_failure() {
        let dir = tempfile::tempdir().unwrap();
        let meta = FileMetadata::from_path(dir.path()).await.unwrap();
        let store = InMemoryBlobStore::hierarchical();
        store.fail_on(crate::store::in_memory::StoreCall::GetAccessControl, "export1/a");
        let err = MetadataStrategy::resolve(
            NamespaceMode::Hierarchical,
            &meta,
            &store,
            &location("export1/a"),
        )
        .await
        .unwrap_err();
        assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    }
}
