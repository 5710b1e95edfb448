/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::cmp;
use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;

use crate::error::{self, Error};
use crate::metrics::unit::ByteUnit;

/// Builder for creating a `PartReader`
#[derive(Debug)]
pub(crate) struct Builder {
    path: Option<PathBuf>,
    length: u64,
    part_size: u64,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self {
            path: None,
            length: 0,
            part_size: 8 * ByteUnit::Mebibyte.as_bytes_u64(),
        }
    }

    /// Set the file to read from.
    pub(crate) fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the number of bytes to read, normally the file size observed when the
    /// operation started.
    pub(crate) fn length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    /// Set the block size that should be used when reading data.
    ///
    /// All parts except for possibly the last one are of this size.
    pub(crate) fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    pub(crate) fn build(self) -> Result<PartReader, Error> {
        let path = self
            .path
            .ok_or_else(|| error::invalid_input("part reader requires a source path"))?;
        if self.part_size == 0 {
            return Err(error::invalid_input("block size must be greater than zero"));
        }
        Ok(PartReader {
            path,
            part_size: self.part_size,
            state: Mutex::new(PartReaderState::new(self.length)),
        })
    }
}

/// Hands out consecutive fixed-size blocks of a file to any number of concurrent workers.
#[derive(Debug)]
pub(crate) struct PartReader {
    path: PathBuf,
    part_size: u64,
    state: Mutex<PartReaderState>, // std Mutex, never held across an await
}

/// Contents of a single block of a file.
#[derive(Debug, Clone)]
pub(crate) struct PartData {
    // 1-indexed
    pub(crate) part_number: u64,
    pub(crate) offset: u64,
    pub(crate) data: Bytes,
}

#[derive(Debug)]
struct PartReaderState {
    // current start offset
    offset: u64,
    // current part number
    part_number: u64,
    // total number of bytes remaining to be read
    remaining: u64,
}

impl PartReaderState {
    fn new(content_length: u64) -> Self {
        Self {
            offset: 0,
            part_number: 1,
            remaining: content_length,
        }
    }
}

impl PartReader {
    /// Total number of blocks this reader will produce
    pub(crate) fn total_parts(length: u64, part_size: u64) -> u64 {
        length.div_ceil(part_size)
    }

    /// Claim the next block and read it from disk.
    ///
    /// Returns `Ok(None)` once every block has been handed out.
    pub(crate) async fn next_part(&self) -> Result<Option<PartData>, Error> {
        let (offset, part_number, part_size) = {
            let mut state = self.state.lock().map_err(|_| {
                Error::new(error::ErrorKind::RuntimeError, "part reader state poisoned")
            })?;
            if state.remaining == 0 {
                return Ok(None);
            }
            let offset = state.offset;
            let part_number = state.part_number;

            let part_size = cmp::min(self.part_size, state.remaining);
            state.offset += part_size;
            state.part_number += 1;
            state.remaining -= part_size;

            (offset, part_number, part_size)
        };
        let path = self.path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut dst = vec![0u8; part_size as usize];
            file_util::read_file_chunk_sync(&mut dst, path, offset)?;
            Ok::<PartData, Error>(PartData {
                part_number,
                offset,
                data: Bytes::from(dst),
            })
        });

        handle.await?.map(Some)
    }
}

mod file_util {
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom};
    use std::path::Path;

    pub(super) fn read_file_chunk_sync(
        dst: &mut [u8],
        path: impl AsRef<Path>,
        offset: u64,
    ) -> Result<(), io::Error> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(dst)
    }
}
