use log::info;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CACHE_DIR_NAME: &str = "meteomap_cache";

/// `<platform cache dir>/meteomap_cache`.
pub fn get_cache_dir() -> io::Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine system cache directory",
            )
        })
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub async fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Cache path exists but is not a directory: {}", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// A temporary file next to `path`, to be `persist`ed onto it once fully written.
///
/// Readers of `path` then only ever see a complete file.
pub fn temp_file_beside(path: &Path) -> io::Result<NamedTempFile> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    NamedTempFile::new_in(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_directory() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");
        ensure_cache_dir_exists(&nested).await?;
        assert!(nested.is_dir());
        ensure_cache_dir_exists(&nested).await?;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_file_in_place_of_directory() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"x")?;
        assert!(ensure_cache_dir_exists(&file).await.is_err());
        Ok(())
    }

    #[test]
    fn temp_file_is_created_beside_target() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("hourly-72295.parquet");
        let temp = temp_file_beside(&target)?;
        assert_eq!(temp.path().parent(), Some(dir.path()));

        temp.persist(&target).map_err(|e| e.error)?;
        assert!(target.is_file());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
