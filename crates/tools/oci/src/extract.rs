//! Layer archive extraction and binary lookup.
//!
//! Layers are tarballs, usually gzip-compressed. The whole layer is unpacked
//! into a scratch directory and the binary is then searched for by name.

use flate2::read::GzDecoder;
use setup_crowdin_core::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, trace};
use walkdir::WalkDir;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack a layer archive into `dest`.
///
/// Gzip is detected from the leading magic bytes; anything else is read as
/// a plain tar stream.
///
/// # Errors
///
/// Returns [`Error::ExtractionFailed`] if the archive cannot be read or unpacked.
pub fn unpack_archive(archive: &Path, dest: &Path) -> Result<()> {
    let failed = |e: std::io::Error| {
        Error::ExtractionFailed(format!("{}: {e}", archive.display()))
    };

    let mut file = File::open(archive).map_err(failed)?;
    let mut magic = [0u8; 2];
    let gzip = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(failed(e)),
    };
    file.seek(SeekFrom::Start(0)).map_err(failed)?;

    std::fs::create_dir_all(dest).map_err(failed)?;
    debug!(?archive, ?dest, gzip, "Unpacking layer");

    let reader = BufReader::new(file);
    if gzip {
        Archive::new(GzDecoder::new(reader)).unpack(dest).map_err(failed)
    } else {
        Archive::new(reader).unpack(dest).map_err(failed)
    }
}

/// Unpack on the blocking pool.
///
/// # Errors
///
/// Same as [`unpack_archive`].
pub async fn unpack_archive_async(archive: PathBuf, dest: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || unpack_archive(&archive, &dest))
        .await
        .map_err(|e| Error::ExtractionFailed(format!("extraction task failed: {e}")))?
}

/// Well-known locations of `binary_name` inside an unpacked image.
fn candidates(root: &Path, binary_name: &str) -> [PathBuf; 4] {
    [
        root.join(binary_name),
        root.join("bin").join(binary_name),
        root.join("usr").join("local").join("bin").join(binary_name),
        root.join(binary_name).join(binary_name),
    ]
}

/// Find the binary inside an unpacked layer.
///
/// The well-known locations are checked first. Otherwise the tree is walked
/// depth-first and the first regular file whose name equals or ends with
/// `binary_name` wins.
///
/// # Errors
///
/// Returns [`Error::BinaryNotFoundInArchive`] when nothing matches.
pub fn locate_binary(root: &Path, binary_name: &str) -> Result<PathBuf> {
    if let Some(found) = candidates(root, binary_name)
        .into_iter()
        .find(|candidate| candidate.is_file())
    {
        debug!(path = ?found, "Found binary at a well-known location");
        return Ok(found);
    }

    trace!(?root, binary_name, "Scanning unpacked layer");
    let found = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(binary_name))
        })
        .map(walkdir::DirEntry::into_path);

    match found {
        Some(path) => {
            debug!(?path, "Found binary by scanning");
            Ok(path)
        }
        None => Err(Error::BinaryNotFoundInArchive(binary_name.to_string())),
    }
}
