// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Bounded collection of artefact photographs and their annotations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{LensError, Result};

/// Maximum number of views of one object that can be analysed together
pub const MAX_IMAGES: usize = 4;

/// Stable identity of an image for its whole lifetime. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for ImageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file handed over by the acquisition surface (picker, camera, drop)
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content,
            mime_type: mime_type.into(),
        }
    }

    /// Whether the declared type is in the image category
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Read a file from disk, detecting its MIME type from content first
    /// and from the extension second
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mime_type = match image::guess_format(&content) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => mime_from_extension(path)
                .ok_or_else(|| LensError::UnsupportedFileType(path.display().to_string()))?,
        };

        Ok(Self { name, content, mime_type })
    }
}

fn mime_from_extension(path: &Path) -> Option<String> {
    if let Ok(format) = image::ImageFormat::from_path(path) {
        return Some(format.to_mime_type().to_string());
    }
    // Formats the image crate cannot decode but the proxy accepts
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "heic" => Some("image/heic".to_string()),
        "heif" => Some("image/heif".to_string()),
        _ => None,
    }
}

/// Keep only image payloads; everything else is dropped without error
pub fn accept_images(files: Vec<ImageFile>) -> Vec<ImageFile> {
    files
        .into_iter()
        .filter(|f| {
            let ok = f.is_image();
            if !ok {
                debug!("Ignoring non-image file {:?} ({})", f.name, f.mime_type);
            }
            ok
        })
        .collect()
}

#[derive(Debug, Default)]
struct PreviewCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Tracks acquisition and release of preview handles
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    counters: Arc<PreviewCounters>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self, id: ImageId) -> PreviewHandle {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        trace!("Preview acquired for {}", id);
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Handles acquired and not yet released
    pub fn live(&self) -> usize {
        self.acquired() - self.released()
    }
}

/// Display handle for an image preview.
///
/// Released exactly once, when dropped together with its image.
#[derive(Debug)]
pub struct PreviewHandle {
    id: ImageId,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    /// URL under which the web API serves the preview bytes
    pub fn url(&self) -> String {
        format!("/api/images/{}/preview", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.counters.released.fetch_add(1, Ordering::SeqCst);
        trace!("Preview released for {}", self.id);
    }
}

/// One photograph of the object under analysis
#[derive(Debug)]
pub struct ArtifactImage {
    id: ImageId,
    name: String,
    content: Arc<[u8]>,
    mime_type: String,
    preview: PreviewHandle,
    annotation: String,
}

impl ArtifactImage {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared view of the binary payload
    pub fn content(&self) -> Arc<[u8]> {
        Arc::clone(&self.content)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }
}

/// Ordered, bounded set of artefact images.
///
/// Insertion order is preserved and never changed by any operation.
#[derive(Debug, Default)]
pub struct ImageCollection {
    images: Vec<ArtifactImage>,
    previews: PreviewRegistry,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection whose preview handles report to `previews`
    pub fn with_registry(previews: PreviewRegistry) -> Self {
        Self {
            images: Vec::new(),
            previews,
        }
    }

    /// Append one image per file, in input order.
    ///
    /// Files that do not fit under [`MAX_IMAGES`] are discarded silently.
    /// Returns the ids of the images actually added.
    pub fn add(&mut self, files: impl IntoIterator<Item = ImageFile>) -> Vec<ImageId> {
        let room = self.remaining_capacity();
        let mut added = Vec::new();

        for file in files.into_iter().take(room) {
            let id = ImageId::new();
            let preview = self.previews.acquire(id);
            self.images.push(ArtifactImage {
                id,
                name: file.name,
                content: Arc::from(file.content),
                mime_type: file.mime_type,
                preview,
                annotation: String::new(),
            });
            added.push(id);
        }

        added
    }

    /// Remove the image with `id`, releasing its preview. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, id: ImageId) -> bool {
        match self.images.iter().position(|img| img.id == id) {
            Some(index) => {
                self.images.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace the annotation of the image with `id`. Returns whether the
    /// image was found.
    pub fn set_annotation(&mut self, id: ImageId, text: impl Into<String>) -> bool {
        match self.images.iter_mut().find(|img| img.id == id) {
            Some(img) => {
                img.annotation = text.into();
                true
            }
            None => false,
        }
    }

    /// Release every preview and empty the collection
    pub fn clear(&mut self) {
        self.images.clear();
    }

    pub fn get(&self, id: ImageId) -> Option<&ArtifactImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactImage> {
        self.images.iter()
    }

    pub fn as_slice(&self) -> &[ArtifactImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        MAX_IMAGES.saturating_sub(self.images.len())
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }
}

#[cfg(test)]
pub(crate) fn sample_file(name: &str) -> ImageFile {
    ImageFile::new(name, name.as_bytes().to_vec(), "image/jpeg")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<ImageFile> {
        names.iter().map(|n| sample_file(n)).collect()
    }

    fn names(collection: &ImageCollection) -> Vec<&str> {
        collection.iter().map(|img| img.name()).collect()
    }

    #[test]
    fn test_add_preserves_input_order() {
        let mut collection = ImageCollection::new();
        let ids = collection.add(files(&["a", "b", "c"]));

        assert_eq!(ids.len(), 3);
        assert_eq!(names(&collection), vec!["a", "b", "c"]);
        assert_eq!(collection.iter().map(|i| i.id()).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_add_truncates_single_batch_at_cap() {
        let mut collection = ImageCollection::new();
        let ids = collection.add(files(&["1", "2", "3", "4", "5", "6"]));

        assert_eq!(ids.len(), MAX_IMAGES);
        assert_eq!(names(&collection), vec!["1", "2", "3", "4"]);
        // Discarded files never acquired a preview
        assert_eq!(collection.previews().acquired(), MAX_IMAGES);
    }

    #[test]
    fn test_add_truncates_cumulative_batches() {
        let mut collection = ImageCollection::new();
        collection.add(files(&["1", "2", "3"]));
        let ids = collection.add(files(&["4", "5"]));

        assert_eq!(ids.len(), 1);
        assert_eq!(names(&collection), vec!["1", "2", "3", "4"]);
        assert!(collection.add(files(&["6"])).is_empty());
        assert_eq!(collection.len(), MAX_IMAGES);
    }

    #[test]
    fn test_remove_releases_preview_once() {
        let mut collection = ImageCollection::new();
        let ids = collection.add(files(&["a", "b"]));

        assert!(collection.remove(ids[0]));
        assert_eq!(names(&collection), vec!["b"]);
        assert_eq!(collection.previews().released(), 1);

        // Second removal of the same id is a no-op
        assert!(!collection.remove(ids[0]));
        assert_eq!(collection.previews().released(), 1);
        assert_eq!(collection.previews().live(), 1);
    }

    #[test]
    fn test_remove_keeps_order_of_rest() {
        let mut collection = ImageCollection::new();
        let ids = collection.add(files(&["a", "b", "c", "d"]));
        collection.remove(ids[1]);
        collection.add(files(&["e"]));

        assert_eq!(names(&collection), vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn test_set_annotation() {
        let mut collection = ImageCollection::new();
        let ids = collection.add(files(&["a", "b"]));

        assert!(collection.set_annotation(ids[1], "Rückseite"));
        assert_eq!(collection.get(ids[1]).unwrap().annotation(), "Rückseite");
        assert_eq!(collection.get(ids[0]).unwrap().annotation(), "");

        collection.remove(ids[1]);
        assert!(!collection.set_annotation(ids[1], "gone"));
    }

    #[test]
    fn test_clear_releases_all_previews() {
        let registry = PreviewRegistry::new();
        let mut collection = ImageCollection::with_registry(registry.clone());
        collection.add(files(&["a", "b", "c"]));
        assert_eq!(registry.live(), 3);

        collection.clear();
        assert!(collection.is_empty());
        assert_eq!(registry.live(), 0);
        assert_eq!(registry.released(), 3);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut collection = ImageCollection::new();
        let first = collection.add(files(&["a"]));
        collection.clear();
        let second = collection.add(files(&["a"]));
        assert_ne!(first, second);
    }

    #[test]
    fn test_preview_url_contains_id() {
        let mut collection = ImageCollection::new();
        let id = collection.add(files(&["a"]))[0];
        let url = collection.get(id).unwrap().preview().url();
        assert_eq!(url, format!("/api/images/{}/preview", id));
    }

    #[test]
    fn test_accept_images_drops_non_images() {
        let batch = vec![
            sample_file("photo.jpg"),
            ImageFile::new("notes.txt", b"hello".to_vec(), "text/plain"),
            ImageFile::new("scan.png", vec![], "image/png"),
        ];
        let accepted = accept_images(batch);
        let names: Vec<_> = accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["photo.jpg", "scan.png"]);
    }

    #[test]
    fn test_from_path_sniffs_content() {
        let dir = tempfile::tempdir().unwrap();
        // Named .jpg but the bytes are a PNG signature
        let path = dir.path().join("mislabelled.jpg");
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        std::fs::write(&path, png).unwrap();

        let file = ImageFile::from_path(&path).unwrap();
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.name, "mislabelled.jpg");
    }

    #[test]
    fn test_from_path_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phone.heic");
        std::fs::write(&path, b"not a sniffable header").unwrap();

        let file = ImageFile::from_path(&path).unwrap();
        assert_eq!(file.mime_type, "image/heic");
    }

    #[test]
    fn test_from_path_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();

        assert!(matches!(
            ImageFile::from_path(&path),
            Err(LensError::UnsupportedFileType(_))
        ));
    }
}
