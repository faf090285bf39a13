use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::SystemTime,
};

use tracing::{debug, info};

use crate::{Error, Frame};

/// Identity of a file on disk: a change in either field means the file was
/// rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl Stamp {
    fn of(path: &Path) -> Result<Self, Error> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Cached {
    path: PathBuf,
    stamp: Stamp,
    frame: Arc<Frame>,
}

/// Reads the observation table and keeps it in memory. Repeated loads of an
/// unchanged file return the same `Arc`.
#[derive(Debug, Default)]
pub struct DataLoader {
    cache: Mutex<Option<Cached>>,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self, path: &Path) -> Result<Arc<Frame>, Error> {
        let stamp = Stamp::of(path)?;
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.as_ref() {
            if cached.path == path && cached.stamp == stamp {
                debug!("Using cached table");
                return Ok(Arc::clone(&cached.frame));
            }
            info!("Data file changed, reloading");
        }
        let frame = Arc::new(Frame::from_path(path)?);
        *cache = Some(Cached {
            path: path.to_path_buf(),
            stamp,
            frame: Arc::clone(&frame),
        });
        Ok(frame)
    }

    /// Drop the cached table so the next load reads the file again.
    pub fn clear(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_load_is_memoized() {
        let loader = DataLoader::new();
        let path = Path::new("tests/data/did_small.csv");
        let a = loader.load(path).unwrap();
        let b = loader.load(path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
        assert_eq!(a.nrows(), 8);
    }

    #[test]
    fn test_clear_reloads_identical_content() {
        let loader = DataLoader::new();
        let path = Path::new("tests/data/did_small.csv");
        let a = loader.load(path).unwrap();
        loader.clear();
        let b = loader.load(path).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_changed_file_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "ano,treat\n2019,0\n").unwrap();
        let loader = DataLoader::new();
        let a = loader.load(&path).unwrap();
        assert_eq!(a.nrows(), 1);
        std::fs::write(&path, "ano,treat\n2019,0\n2020,1\n").unwrap();
        let b = loader.load(&path).unwrap();
        assert_eq!(b.nrows(), 2);
    }

    #[test]
    fn test_missing_file() {
        let loader = DataLoader::new();
        assert!(matches!(
            loader.load(Path::new("tests/data/missing.csv")),
            Err(Error::Io(_))
        ));
    }
}
