//! Where front-end files come from.
//!
//! Development builds read straight from the app directory so edits show up
//! on reload. Release builds serve a bundle compiled into the binary, e.g.
//! with `include_bytes!`:
//!
//! ```rust,no_run
//! use trellis::AssetSource;
//!
//! let version = std::env::var("APP_VERSION").unwrap_or_default();
//! let assets = AssetSource::select(&version, "app", || {
//!     AssetSource::bundle([
//!         ("index.html", &b"<!doctype html>"[..]),
//!         // ("main.js", include_bytes!("../app/main.js")),
//!     ])
//! });
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

/// Version string that selects on-disk assets.
pub const DEVELOPMENT: &str = "development";

/// A read-only tree of files addressed by `/`-separated relative paths.
#[derive(Clone, Debug)]
pub enum AssetSource {
    /// Files under a directory on disk, read on every request.
    Directory(PathBuf),
    /// Files held in memory.
    Bundle(Arc<HashMap<String, Bytes>>),
}

impl AssetSource {
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self::Directory(root.into())
    }

    pub fn bundle<I, K>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, &'static [u8])>,
        K: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(path, bytes)| (path.into(), Bytes::from_static(bytes)))
            .collect();
        Self::Bundle(Arc::new(files))
    }

    /// The directory when `version` is `"development"`, otherwise the bundle.
    pub fn select(
        version: &str,
        directory: impl Into<PathBuf>,
        bundle: impl FnOnce() -> AssetSource,
    ) -> Self {
        if version == DEVELOPMENT {
            Self::directory(directory)
        } else {
            bundle()
        }
    }

    /// Reads one file. `None` when it does not exist, cannot be read, or the
    /// path tries to leave the source root.
    pub async fn read(&self, path: &str) -> Option<Bytes> {
        let path = path.trim_start_matches('/');
        if !is_contained(path) {
            debug!(path, "rejected asset path");
            return None;
        }

        match self {
            Self::Bundle(files) => files.get(path).cloned(),
            Self::Directory(root) => match tokio::fs::read(root.join(path)).await {
                Ok(bytes) => Some(Bytes::from(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => {
                    warn!(path, root = %root.display(), "unable to read asset: {e}");
                    None
                }
            },
        }
    }
}

fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && !path.contains('\\')
        && Path::new(path).components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bundle_serves_its_files() {
        let assets = AssetSource::bundle([("index.html", &b"<html>"[..])]);
        assert_eq!(assets.read("index.html").await.as_deref(), Some(&b"<html>"[..]));
        assert_eq!(assets.read("/index.html").await.as_deref(), Some(&b"<html>"[..]));
        assert!(assets.read("main.js").await.is_none());
    }

    #[tokio::test]
    async fn directory_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/app.css"), "body{}").unwrap();

        let assets = AssetSource::directory(dir.path());
        assert_eq!(assets.read("static/app.css").await.as_deref(), Some(&b"body{}"[..]));
        assert!(assets.read("static/missing.css").await.is_none());
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();

        let assets = AssetSource::directory(dir.path().join("app"));
        assert!(assets.read("../secret.txt").await.is_none());
        assert!(assets.read("static/../../secret.txt").await.is_none());
        assert!(assets.read("").await.is_none());
    }

    #[test]
    fn development_selects_the_directory() {
        let bundle = || AssetSource::bundle([("index.html", &b""[..])]);

        let dev = AssetSource::select(DEVELOPMENT, "app", bundle);
        assert!(matches!(dev, AssetSource::Directory(ref root) if root == Path::new("app")));

        let release = AssetSource::select("1.4.0", "app", bundle);
        assert!(matches!(release, AssetSource::Bundle(_)));
    }
}
