// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Atomic persistence of zone files.
//!
//! [`write_atomic`] writes new content to a temporary file in the same
//! directory as the target and then renames it into place, so that an
//! observer of the target path sees either the complete old content or
//! the complete new content, never a mixture. Both paths must be on the
//! same filesystem for this to hold; since the temporary file is a
//! sibling of the target, that is only violated if the target is itself
//! a mount point.
//!
//! [`ZoneFiles`] applies these operations to the zone directory.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::name;
use crate::zone_file::{self, ZoneFileText};

/// The suffix of temporary files created by [`write_atomic`].
const TEMP_SUFFIX: &str = ".tmp";

////////////////////////////////////////////////////////////////////////
// PRIMITIVES                                                         //
////////////////////////////////////////////////////////////////////////

/// Atomically replaces the content of the file at `path` with
/// `contents`, creating the file if it does not exist.
///
/// If an error occurs, the target is left untouched and the temporary
/// file is removed.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let dir = parent_dir(path);
    let temp_path = dir.join(temp_file_name(file_name));

    if let Err(e) = write_then_rename(&temp_path, path, contents).await {
        if let Err(cleanup_error) = fs::remove_file(&temp_path).await {
            if cleanup_error.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove temporary file {}: {}.",
                    temp_path.display(),
                    cleanup_error
                );
            }
        }
        return Err(e);
    }

    // The rename is already visible at this point; a failure to make it
    // durable is reported but does not undo it.
    if let Err(e) = sync_dir(dir).await {
        warn!("Failed to sync directory {}: {}.", dir.display(), e);
    }
    Ok(())
}

async fn write_then_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn temp_file_name(file_name: &OsStr) -> String {
    format!(
        ".{}.{:016x}{}",
        file_name.to_string_lossy(),
        rand::random::<u64>(),
        TEMP_SUFFIX
    )
}

/// Removes the file at `path`. Returns whether a file was removed; a
/// file that does not exist is not an error.
pub async fn remove_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Reads the file at `path`, returning `None` if it does not exist.
pub async fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

////////////////////////////////////////////////////////////////////////
// ZONE DIRECTORY                                                     //
////////////////////////////////////////////////////////////////////////

/// The directory in which zone files are kept. Each zone owns exactly
/// one path in it, derived from its normalized name.
#[derive(Clone, Debug)]
pub struct ZoneFiles {
    dir: PathBuf,
}

impl ZoneFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file for the zone with the given
    /// (normalized) name.
    pub fn path_for(&self, zone_name: &str) -> PathBuf {
        self.dir.join(zone_file::file_name(zone_name))
    }

    pub async fn write(&self, zone_name: &str, text: &ZoneFileText) -> io::Result<()> {
        self.write_bytes(zone_name, text.as_bytes()).await
    }

    pub async fn write_bytes(&self, zone_name: &str, contents: &[u8]) -> io::Result<()> {
        write_atomic(&self.path_for(zone_name), contents).await
    }

    pub async fn read(&self, zone_name: &str) -> io::Result<Option<Vec<u8>>> {
        read_if_exists(&self.path_for(zone_name)).await
    }

    pub async fn remove(&self, zone_name: &str) -> io::Result<bool> {
        remove_file(&self.path_for(zone_name)).await
    }

    pub async fn exists(&self, zone_name: &str) -> io::Result<bool> {
        match fs::metadata(self.path_for(zone_name)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Lists the names of the zones that have files in the directory,
    /// in sorted order. Files whose names are not the file name of a
    /// normalized zone name (including temporary files) are skipped.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut zones = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name
                .strip_suffix(zone_file::FILE_EXTENSION)
                .and_then(|s| s.strip_suffix('.'))
            else {
                continue;
            };
            match name::normalize_zone_name(stem) {
                Ok(normalized) if normalized == stem => zones.push(normalized),
                _ => debug!("Skipping {} in the zone directory.", file_name),
            }
        }
        zones.sort_unstable();
        Ok(zones)
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
