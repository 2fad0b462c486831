// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Artifact integrity verification using SHA-256 checksums.
//!
//! Every compiled index is sealed with the SHA-256 of its file bytes; edge
//! devices verify the hash after download before loading the index.

use ring::digest::{Context, SHA256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Compute the lowercase hex SHA-256 of a byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut context = Context::new(&SHA256);
    context.update(data);
    hex::encode(context.finish().as_ref())
}

/// Compute the lowercase hex SHA-256 of a file, streaming in 8 KiB chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = Context::new(&SHA256);
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }
    Ok(hex::encode(context.finish().as_ref()))
}

/// Recompute a file's hash and compare it to the expected value.
///
/// Comparison is case-insensitive on the expected side; the stored form is
/// always lowercase.
pub fn verify_file(path: &Path, expected_hash: &str) -> io::Result<bool> {
    let actual = hash_file(path)?;
    Ok(actual == expected_hash.to_ascii_lowercase())
}
