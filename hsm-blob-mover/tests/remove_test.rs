/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![cfg(target_family = "unix")]


use std::sync::Arc;

use hsm_blob_mover::error::ErrorKind;
use hsm_blob_mover::store::in_memory::{InMemoryBlobStore, StoreCall};
use hsm_blob_mover::types::NamespaceMode;
use test_common::create_mount;
use test_utils::{client, config};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_remove_keeps_placeholders() {
    let mount = create_mount(&[("a/b/file.txt", 100)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    client
        .archive()
        .object_name("a/b/file.txt")
        .send()
        .await
        .unwrap();
    store.snapshot("export1/a/b/file.txt").unwrap();

    let output = client
        .remove()
        .object_name("a/b/file.txt")
        .send()
        .await
        .unwrap();

    assert_eq!("export1/a/b/file.txt", output.object_key());
    assert_eq!(vec!["export1/a", "export1/a/b"], store.keys());
    assert_eq!(0, store.snapshot_count("export1/a/b/file.txt"));
    // the local file is left alone
    assert!(mount.path().join("a/b/file.txt").exists());
}

#[tokio::test]
async fn test_remove_missing_object() {
    let mount = create_mount(&[], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .remove()
        .object_name("never/archived.txt")
        .send()
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        vec!["export1/never/archived.txt"],
        store.calls(StoreCall::DeleteBlob)
    );
}

#[tokio::test]
async fn test_remove_backend_failure() {
    let mount = create_mount(&[("f", 1)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);
    client.archive().object_name("f").send().await.unwrap();
    store.fail_all(StoreCall::DeleteBlob);

    let err = client.remove().object_name("f").send().await.unwrap_err();
    assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    assert_eq!(vec!["export1/f"], store.keys());

    store.clear_failures();
    client.remove().object_name("f").send().await.unwrap();
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_remove_cancelled() {
    let mount = create_mount(&[], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);
    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .remove()
        .object_name("f")
        .cancellation_token(token)
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
}
