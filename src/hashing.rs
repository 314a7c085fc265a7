// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    fs::File,
    io::Read,
    path::Path,
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Calculate the SHA-256 hash of a byte slice.
pub fn calculate_hash(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Hash a bounded prefix of a file. Used as the fast duplicate filter.
pub fn hash_file_prefix(path: &Path, prefix_bytes: usize) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Could not open '{}'", path.display()))?;

    let mut buffer = vec![0u8; prefix_bytes];
    let mut filled = 0;
    while filled < prefix_bytes {
        let n = file
            .read(&mut buffer[filled..])
            .with_context(|| format!("Could not read '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    Ok(calculate_hash(&buffer[..filled]))
}

/// Hash the full contents of a file in streaming chunks.
pub fn hash_file_full(path: &Path, buffer_bytes: usize) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Could not open '{}'", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; buffer_bytes];
    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("Could not read '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
