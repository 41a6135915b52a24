//! Image loading and caching.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, warn};

use crate::document::is_image_file;

/// Bounded cache of decoded images, evicting the oldest entry first.
///
/// Failed loads are cached as `None` so a missing file is not retried on
/// every frame.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<PathBuf, Option<DynamicImage>>,
    order: VecDeque<PathBuf>,
    max_size: usize,
}

impl ImageCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Option<DynamicImage>> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, image: Option<DynamicImage>) {
        if self.entries.insert(path.clone(), image).is_some() {
            return;
        }
        self.order.push_back(path);
        while self.entries.len() > self.max_size {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves image references against the book's directory.
#[derive(Debug)]
pub struct ImageLoader {
    cache: ImageCache,
    base_path: PathBuf,
}

impl ImageLoader {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            cache: ImageCache::new(16),
            base_path,
        }
    }

    /// Load `src`, using the cache when possible.
    pub fn load(&mut self, src: &str) -> Option<&DynamicImage> {
        let path = self.resolve_path(src)?;
        if self.cache.get(&path).is_none() {
            let loaded = if is_image_file(&path) {
                match image::open(&path) {
                    Ok(img) => {
                        debug!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
                        Some(img)
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "image load failed");
                        None
                    }
                }
            } else {
                debug!(path = %path.display(), "not an image file");
                None
            };
            self.cache.insert(path.clone(), loaded);
        }
        self.cache.get(&path).and_then(Option::as_ref)
    }

    /// Local path for `src`. Remote and data URLs have none.
    pub fn resolve_path(&self, src: &str) -> Option<PathBuf> {
        let src = src.trim();
        if src.is_empty() || src.contains("://") || src.starts_with("data:") {
            return None;
        }
        let src = src.strip_prefix("file:").unwrap_or(src);
        let path = Path::new(src);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        })
    }

    pub fn set_base_path(&mut self, base_path: PathBuf) {
        if base_path != self.base_path {
            self.cache.clear();
            self.base_path = base_path;
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub const fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn tiny() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])))
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let mut cache = ImageCache::new(2);
        cache.insert(PathBuf::from("a"), Some(tiny()));
        cache.insert(PathBuf::from("b"), None);
        cache.insert(PathBuf::from("c"), Some(tiny()));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(Path::new("a")).is_none());
        assert!(matches!(cache.get(Path::new("b")), Some(None)));
    }

    #[test]
    fn test_resolve_path_relative_and_remote() {
        let loader = ImageLoader::new(PathBuf::from("/books/cells"));
        assert_eq!(
            loader.resolve_path("img/a.png"),
            Some(PathBuf::from("/books/cells/img/a.png"))
        );
        assert_eq!(
            loader.resolve_path("/abs/b.png"),
            Some(PathBuf::from("/abs/b.png"))
        );
        assert_eq!(loader.resolve_path("https://example.com/c.png"), None);
        assert_eq!(loader.resolve_path("data:image/png;base64,AAAA"), None);
    }

    #[test]
    fn test_load_caches_hits_and_misses() {
        let dir = tempdir().unwrap();
        RgbaImage::from_pixel(3, 2, Rgba([9, 9, 9, 255]))
            .save(dir.path().join("a.png"))
            .unwrap();
        let mut loader = ImageLoader::new(dir.path().to_path_buf());

        assert_eq!(loader.load("a.png").map(DynamicImage::width), Some(3));
        assert!(loader.load("missing.png").is_none());
        assert!(loader.load("notes.txt").is_none());
        assert_eq!(loader.cache().len(), 3);

        loader.set_base_path(PathBuf::from("/elsewhere"));
        assert!(loader.cache().is_empty());
    }
}
