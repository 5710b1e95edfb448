/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![cfg(target_family = "unix")]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::{fs, io::Write};
use tempfile::{tempdir, TempDir};

/// Deterministic, non-repeating-per-block content of `len` bytes
pub fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Create a mount tree in a temporary directory, containing files with sizes specified in
/// `files`. File content is [`pattern_bytes`].
///
/// `dir_modes` sets the permission bits of directories (relative to the mount root) after the
/// files are written, e.g. `[("a", 0o750)]`.
pub fn create_mount(files: &[(&str, usize)], dir_modes: &[(&str, u32)]) -> TempDir {
    let mount = tempdir().unwrap();

    for (path, size) in files {
        let full_path = mount.path().join(path);
        let parent = full_path.parent().unwrap();
        fs::create_dir_all(parent).unwrap();

        let mut file = fs::File::create(&full_path).unwrap();
        file.write_all(&pattern_bytes(*size)).unwrap();
    }

    for (dir, mode) in dir_modes {
        set_mode(&mount.path().join(dir), *mode);
    }

    mount
}

/// Set the permission bits of `path`
pub fn set_mode(path: &Path, mode: u32) {
    let mut permissions = fs::metadata(path).unwrap().permissions();
    permissions.set_mode(mode);
    fs::set_permissions(path, permissions).unwrap();
}
