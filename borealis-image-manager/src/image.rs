//! Manages scanout image objects and their properties.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Represents a unique identifier for a client that owns images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    /// Creates a new client ID from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Represents a unique identifier for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId {
    fn new_unique() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
        ImageId(NEXT_ID.fetch_add(1, Ordering::Relaxed) as u64)
    }
}

/// Specifies the underlying backing of an image's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBacking {
    /// Shared-memory backed image.
    Shm,
    /// Image represented by a DMA buffer file descriptor.
    DmaBuf,
    /// Opaque GPU texture managed by the rendering backend.
    GpuTexture,
}

/// Enumerates common pixel formats for images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// 32-bit ARGB, 8 bits per channel, alpha first.
    Argb8888,
    /// 32-bit XRGB, 8 bits per channel, alpha ignored.
    Xrgb8888,
    /// 2-plane YUV, Y followed by interleaved UV.
    Nv12,
}

/// Holds detailed information about a scanout image.
///
/// The `ref_count` here is the protocol-level reference count: how many
/// active or staged configurations currently name this image. It is tracked
/// separately from the `Arc` so that release semantics stay observable (the
/// commit engine must decrement it exactly once per released reference).
#[derive(Debug)]
pub struct ImageDetails {
    /// Unique identifier for this image.
    pub id: ImageId,
    /// The memory backing of the image.
    pub backing: ImageBacking,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Stride in bytes.
    pub stride: u32,
    /// Pixel format.
    pub format: ImageFormat,
    /// Protocol-level reference counter.
    pub ref_count: AtomicUsize,
    /// Optional ID of the client that owns this image.
    pub client_owner_id: Option<ClientId>,
}

impl ImageDetails {
    /// Creates a new `ImageDetails` with a fresh unique id.
    ///
    /// The initial reference count is 1, representing the registering owner.
    pub fn new(
        backing: ImageBacking,
        width: u32,
        height: u32,
        stride: u32,
        format: ImageFormat,
        client_owner_id: Option<ClientId>,
    ) -> Self {
        debug_assert!(width > 0, "Image width must be positive.");
        debug_assert!(height > 0, "Image height must be positive.");

        Self {
            id: ImageId::new_unique(),
            backing,
            width,
            height,
            stride,
            format,
            ref_count: AtomicUsize::new(1),
            client_owner_id,
        }
    }

    /// Increments the protocol reference count.
    pub fn increment_ref_count(&self) {
        self.ref_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the protocol reference count.
    ///
    /// Returns `true` if the count reached zero.
    pub fn decrement_ref_count(&self) -> bool {
        self.ref_count.fetch_sub(1, Ordering::Relaxed) == 1
    }
}

/// Manages the set of images known to the display stack.
///
/// Allows registering new images, retrieving their details, and releasing
/// references. An image whose reference count drops to zero is removed from
/// the manager, at which point the owning client can be notified.
#[derive(Default)]
pub struct ImageManager {
    images: HashMap<ImageId, Arc<Mutex<ImageDetails>>>,
}

impl ImageManager {
    /// Creates a new, empty `ImageManager`.
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
        }
    }

    /// Registers a new image with the given properties.
    ///
    /// Returns the shared handle; the image starts with a reference count
    /// of 1 held by the registering owner.
    pub fn register_image(
        &mut self,
        backing: ImageBacking,
        width: u32,
        height: u32,
        stride: u32,
        format: ImageFormat,
        client_owner_id: Option<ClientId>,
    ) -> Arc<Mutex<ImageDetails>> {
        let details = ImageDetails::new(backing, width, height, stride, format, client_owner_id);
        let id = details.id;
        let arc_details = Arc::new(Mutex::new(details));
        self.images.insert(id, arc_details.clone());
        arc_details
    }

    /// Retrieves the shared handle for a given `ImageId`.
    pub fn get_image_details(&self, id: ImageId) -> Option<Arc<Mutex<ImageDetails>>> {
        self.images.get(&id).cloned()
    }

    /// Releases one reference to an image.
    ///
    /// Decrements the protocol reference count. If the count drops to zero
    /// the image is removed from the manager. Returns the handle if the
    /// image was known, `None` otherwise.
    pub fn release_image(&mut self, id: ImageId) -> Option<Arc<Mutex<ImageDetails>>> {
        let image_arc = self.images.get(&id)?;
        let should_remove = {
            let details = image_arc.lock().unwrap();
            details.decrement_ref_count()
        };

        if should_remove {
            self.images.remove(&id)
        } else {
            Some(image_arc.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_image_ids() {
        let id1 = ImageId::new_unique();
        let id2 = ImageId::new_unique();
        assert_ne!(id1, id2, "ImageId::new_unique should generate unique IDs.");
    }

    #[test]
    fn test_register_image() {
        let mut manager = ImageManager::new();
        let client_id = Some(ClientId::new(1));
        let image_arc = manager.register_image(
            ImageBacking::Shm,
            640,
            480,
            640 * 4,
            ImageFormat::Argb8888,
            client_id,
        );

        let id = image_arc.lock().unwrap().id;
        let details = manager.get_image_details(id).unwrap();
        let locked = details.lock().unwrap();
        assert_eq!(locked.width, 640);
        assert_eq!(locked.height, 480);
        assert_eq!(locked.stride, 640 * 4);
        assert_eq!(locked.format, ImageFormat::Argb8888);
        assert_eq!(locked.client_owner_id, client_id);
        assert_eq!(
            locked.ref_count.load(Ordering::SeqCst),
            1,
            "Initial ref count should be 1."
        );
    }

    #[test]
    fn test_get_missing_image() {
        let manager = ImageManager::new();
        let unknown = ImageId::new_unique();
        assert!(manager.get_image_details(unknown).is_none());
    }

    #[test]
    fn test_image_reference_counting() {
        let mut manager = ImageManager::new();
        let image_arc = manager.register_image(
            ImageBacking::DmaBuf,
            32,
            32,
            128,
            ImageFormat::Xrgb8888,
            Some(ClientId::new(1)),
        );
        let id = image_arc.lock().unwrap().id;

        image_arc.lock().unwrap().increment_ref_count();
        assert_eq!(image_arc.lock().unwrap().ref_count.load(Ordering::SeqCst), 2);

        let released = manager.release_image(id);
        assert!(released.is_some(), "Image should still be known after one release.");
        assert_eq!(image_arc.lock().unwrap().ref_count.load(Ordering::SeqCst), 1);
        assert!(manager.get_image_details(id).is_some());

        let released_final = manager.release_image(id);
        assert!(released_final.is_some(), "Final release should return the handle.");
        assert_eq!(image_arc.lock().unwrap().ref_count.load(Ordering::SeqCst), 0);
        assert!(
            manager.get_image_details(id).is_none(),
            "Image should be removed from manager after final release."
        );

        assert!(
            manager.release_image(id).is_none(),
            "Releasing an already removed image should return None."
        );
    }
}
