//! Verified file copy and move primitives.
//!
//! A copy is written to a `.partial` sibling, flushed, synced and renamed
//! into place, so the destination name never holds a half-written file. Both
//! operations compare SHA-256 digests of source and destination.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

const BUFFER_SIZE: usize = 64 * 1024;

/// Hex-encoded SHA-256 of a file's content.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex(&hasher.finalize()))
}

/// Copies `source` to `destination`, preserving permissions and
/// modification time, and returns the verified digest.
pub fn copy_verified(source: &Path, destination: &Path) -> io::Result<String> {
    let partial = partial_path(destination);
    let written = write_partial(source, &partial).and_then(|digest| {
        fs::rename(&partial, destination)?;
        Ok(digest)
    });
    let digest = match written {
        Ok(digest) => digest,
        Err(err) => {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
    };

    verify(destination, &digest)?;
    Ok(digest)
}

/// Moves `source` to `destination` and returns the verified digest.
///
/// A rename is tried first; if it fails (for example across filesystems) the
/// file is copied, verified, and only then removed from its old location.
pub fn move_verified(source: &Path, destination: &Path) -> io::Result<String> {
    let digest = file_digest(source)?;
    if fs::rename(source, destination).is_ok() {
        verify(destination, &digest)?;
        return Ok(digest);
    }

    let copied = copy_verified(source, destination)?;
    fs::remove_file(source).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("copied but could not remove source: {err}"),
        )
    })?;
    Ok(copied)
}

/// Creates `dir` (and parents) and checks that files can be created in it.
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let probe = dir.join(format!(".report-sorter-probe-{}", std::process::id()));
    let written = File::create(&probe).and_then(|mut file| {
        file.write_all(b"probe")?;
        file.sync_all()
    });
    let _ = fs::remove_file(&probe);
    written.map_err(|source| PipelineError::Unwritable {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_partial(source: &Path, partial: &Path) -> io::Result<String> {
    let input = File::open(source)?;
    let metadata = input.metadata()?;
    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(File::create(partial)?);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        writer.write_all(&buffer[..read])?;
    }

    let file = writer.into_inner().map_err(|err| err.into_error())?;
    if let Ok(modified) = metadata.modified() {
        file.set_modified(modified)?;
    }
    file.set_permissions(metadata.permissions())?;
    file.sync_all()?;

    Ok(hex(&hasher.finalize()))
}

fn verify(destination: &Path, expected: &str) -> io::Result<()> {
    let actual = file_digest(destination)?;
    if actual == expected {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "checksum mismatch for {}: expected {expected}, found {actual}",
            destination.display()
        )))
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
