//! Filesystem operations on resend files.
//!
//! Blocking I/O runs on the blocking pool. Writers hold an exclusive
//! advisory lock while a file is being filled; readers probe for that lock
//! and treat a held lock, or an empty file, as "still being written".

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use fd_lock::RwLock;

use super::naming;

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(io::Error::other)?
}

/// Write `bytes` to a fresh file in `dir` named after `stem`.
pub(super) async fn write_new(dir: PathBuf, stem: String, bytes: Vec<u8>) -> io::Result<PathBuf> {
    blocking(move || {
        fs::create_dir_all(&dir)?;
        let (path, file) = create_unique(&dir, &stem)?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write()?;
        guard.write_all(&bytes)?;
        guard.sync_all()?;
        Ok(path)
    })
    .await
}

/// Read a file that no writer holds.
///
/// Returns `Ok(None)` while another handle holds the lock or nothing has
/// been written yet.
pub(super) async fn read_settled(path: PathBuf) -> io::Result<Option<Vec<u8>>> {
    blocking(move || {
        let file = OpenOptions::new().read(true).append(true).open(&path)?;
        let mut lock = RwLock::new(file);
        let mut guard = match lock.try_write() {
            Ok(guard) => guard,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(error) => return Err(error),
        };
        let mut bytes = Vec::new();
        guard.read_to_end(&mut bytes)?;
        Ok((!bytes.is_empty()).then_some(bytes))
    })
    .await
}

/// Regular files in `dir`, sorted by name.
pub(super) async fn list(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Move `path` into `dir`, keeping its name unless that is taken.
pub(super) async fn move_into(path: PathBuf, dir: PathBuf) -> io::Result<PathBuf> {
    blocking(move || {
        fs::create_dir_all(&dir)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| io::Error::other(format!("{} has no usable name", path.display())))?
            .to_owned();
        let (target, placeholder) = create_unique(&dir, &name)?;
        drop(placeholder);
        if fs::rename(&path, &target).is_err() {
            // Cross-device moves cannot rename.
            fs::copy(&path, &target)?;
            fs::remove_file(&path)?;
        }
        Ok(target)
    })
    .await
}

fn create_unique(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    let mut attempt = 0_u32;
    loop {
        let path = dir.join(naming::candidate(stem, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                attempt = attempt
                    .checked_add(1)
                    .ok_or_else(|| io::Error::other("no free file name"))?;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn colliding_writes_get_suffixes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stem = String::from("01-02-2025-03-04-05");
        let first = write_new(dir.path().into(), stem.clone(), b"a".to_vec())
            .await
            .expect("first write");
        let second = write_new(dir.path().into(), stem.clone(), b"b".to_vec())
            .await
            .expect("second write");
        assert_eq!(first, dir.path().join("01-02-2025-03-04-05"));
        assert_eq!(second, dir.path().join("01-02-2025-03-04-05.1"));
        assert_eq!(list(dir.path()).await.expect("list"), vec![first, second]);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_files_are_not_settled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pending");
        fs::write(&path, b"").expect("create");
        assert_eq!(read_settled(path.clone()).await.expect("probe"), None);
        fs::write(&path, b"body").expect("fill");
        assert_eq!(
            read_settled(path).await.expect("probe"),
            Some(b"body".to_vec())
        );
    }

    #[rstest]
    #[tokio::test]
    async fn moved_files_avoid_taken_names() {
        let src = tempfile::tempdir().expect("tempdir");
        let dst = tempfile::tempdir().expect("tempdir");
        let path = src.path().join("01-02-2025-03-04-05");
        fs::write(&path, b"x").expect("create");
        fs::write(dst.path().join("01-02-2025-03-04-05"), b"older").expect("occupy");

        let moved = move_into(path.clone(), dst.path().into())
            .await
            .expect("move");
        assert_eq!(moved, dst.path().join("01-02-2025-03-04-05.1"));
        assert!(!path.exists());
        assert_eq!(fs::read(moved).expect("read"), b"x");
    }
}
