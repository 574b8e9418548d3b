//! C2: blob staging store.
//!
//! In two-pass (canonical) mode, blob contents have to be written out before
//! the commit stream that references them is known, then read back in serial
//! order during the emission pass. `original_source/export.c`'s `blobfile`
//! buckets staged files into a fan-out of subdirectories keyed off successive
//! base-256 digits of the serial number, terminating in an `=`-prefixed leaf
//! component, so no single directory holds more files than the filesystem
//! handles comfortably; this mirrors that layout with `tempfile` for the
//! staging root and `flate2` for optional transparent compression on disk.

use crate::error::ExportError;
use crate::mark::Serial;
use std::fs::File;
use std::io::Read as _;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;


pub struct BlobStore {
    root: tempfile::TempDir,
    compress: bool,
}

impl BlobStore {
    pub fn new(compress: bool) -> Result<Self, ExportError> {
        let root = tempfile::tempdir().map_err(|source| ExportError::StagingDirCreate {
            parent: std::env::temp_dir(),
            source,
        })?;
        Ok(BlobStore { root, compress })
    }

    /// Writes `contents` as the staged blob for `serial`, creating whatever
    /// fan-out subdirectories are missing.
    pub fn write_blob(&self, serial: Serial, contents: &[u8]) -> Result<(), ExportError> {
        let path = self.path_for(serial);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::StagingDirCreate {
                parent: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| ExportError::StagingBlobWrite {
            path: path.clone(),
            source,
        })?;
        if self.compress {
            let mut encoder = flate2::write::DeflateEncoder::new(file, flate2::Compression::fast());
            encoder
                .write_all(contents)
                .map_err(|source| ExportError::StagingBlobWrite {
                    path: path.clone(),
                    source,
                })?;
            encoder
                .finish()
                .map_err(|source| ExportError::StagingBlobWrite { path, source })?;
        } else {
            let mut file = file;
            file.write_all(contents)
                .map_err(|source| ExportError::StagingBlobWrite { path, source })?;
        }
        Ok(())
    }

    /// Reads back the staged blob for `serial`. Used by the emitter's
    /// canonical-mode blob phase, which re-reads every blob once in serial
    /// order regardless of the order blobs were staged in.
    pub fn read_blob(&self, serial: Serial) -> Result<Vec<u8>, ExportError> {
        let path = self.path_for(serial);
        let file = File::open(&path).map_err(|source| ExportError::StagingBlobRead {
            path: path.clone(),
            source,
        })?;
        let mut contents = Vec::new();
        if self.compress {
            flate2::read::DeflateDecoder::new(file)
                .read_to_end(&mut contents)
                .map_err(|source| ExportError::StagingBlobRead { path, source })?;
        } else {
            let mut file = file;
            file.read_to_end(&mut contents)
                .map_err(|source| ExportError::StagingBlobRead { path, source })?;
        }
        Ok(contents)
    }

    /// Removes the staged file for `serial`. The engine calls this right
    /// after a blob has been read back and emitted, so peak disk usage stays
    /// bounded by the number of not-yet-emitted blobs rather than the total
    /// history size.
    pub fn unlink_blob(&self, serial: Serial) -> Result<(), ExportError> {
        let path = self.path_for(serial);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ExportError::StagingBlobRead { path, source }),
        }
    }

    /// Builds the fan-out path for `serial`, matching `original_source/
    /// export.c`'s `blobfile`: one directory level per base-256 digit of the
    /// serial, least significant first, with the final (most significant)
    /// digit prefixed `=` to mark it as the leaf rather than another level.
    fn path_for(&self, serial: Serial) -> PathBuf {
        let mut n = serial.get();
        let mut path = self.root.path().to_path_buf();
        loop {
            let digit = n % 256;
            n /= 256;
            if n == 0 {
                path.push(format!("={digit:02x}"));
                break;
            }
            path.push(format!("{digit:02x}"));
        }
        path
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }
}
