//! Scoped file access for documents.
//!
//! Every handle opened here is dropped before the function returns, on success and on error.

use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::Path,
    time::SystemTime,
};

use crate::{MAX_FILE_BYTES, error::ReadError};

/// Read a whole UTF-8 document, refusing anything over [`MAX_FILE_BYTES`].
pub fn read_utf8(path: &Path) -> Result<String, ReadError> {
    let io_err = |source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();
    if len > MAX_FILE_BYTES {
        return Err(ReadError::TooLarge {
            path: path.to_path_buf(),
            len,
            max: MAX_FILE_BYTES,
        });
    }

    let mut text = String::with_capacity(usize::try_from(len).unwrap_or(0));
    // Read one byte past the cap so a file that grew after the metadata call is still caught.
    let read = io::Read::by_ref(&mut file)
        .take(MAX_FILE_BYTES + 1)
        .read_to_string(&mut text)
        .map_err(io_err)?;
    let read = u64::try_from(read).unwrap_or(u64::MAX);
    if read > MAX_FILE_BYTES {
        return Err(ReadError::TooLarge {
            path: path.to_path_buf(),
            len: read,
            max: MAX_FILE_BYTES,
        });
    }

    Ok(text)
}

/// Replace `path` with `contents` without ever leaving a truncated file behind.
///
/// The bytes go to a sibling temp file first, which is synced and then renamed over `path`.
pub fn atomic_write_utf8(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path is missing a file name")
    })?;

    let file_name = file_name.to_string_lossy();
    let pid = u128::from(std::process::id());
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());

    for attempt in 0..10u128 {
        let suffix = pid ^ nanos ^ attempt;
        let tmp_path = dir.join(format!(".mdpad-tmp-{file_name}-{suffix}"));

        let open = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path);
        let mut file = match open {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        };

        let result = (|| -> io::Result<()> {
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            drop(file);
            replace(&tmp_path, path, dir, &file_name, suffix)
        })();

        if let Err(err) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        return Ok(());
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "failed to create a temporary file",
    ))
}

fn replace(
    tmp_path: &Path,
    path: &Path,
    dir: &Path,
    file_name: &str,
    suffix: u128,
) -> io::Result<()> {
    if fs::rename(tmp_path, path).is_ok() {
        return Ok(());
    }

    if !path.exists() {
        return fs::rename(tmp_path, path);
    }

    // Some filesystems refuse to rename over an existing file. Move the original aside first so
    // it can be put back if the second rename fails.
    let backup_path = dir.join(format!(".mdpad-backup-{file_name}-{suffix}"));
    fs::rename(path, &backup_path)?;
    match fs::rename(tmp_path, path) {
        Ok(()) => {
            let _ = fs::remove_file(&backup_path);
            Ok(())
        }
        Err(err) => {
            let _ = fs::rename(&backup_path, path);
            Err(err)
        }
    }
}
