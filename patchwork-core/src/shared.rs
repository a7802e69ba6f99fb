//! Thread-safe image handle and the command surface built on it.
//!
//! A participant's image is touched by the network pipeline (applying
//! received payloads, serializing on `GET`) and by the operator's command
//! loop at the same time. [`SharedImage`] holds the image behind one mutex;
//! each method takes the lock for its whole duration and releases it on
//! every exit path. Two different images never contend.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::geometry::{BoundingBox, Vec2};
use crate::image::{Image, ImageError};
use crate::shape::{Shape, Transformable};

/// One affine operation, as issued by the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Translate(Vec2),
    Homothety { ratio: f32 },
    HomothetyAbout { pivot: Vec2, ratio: f32 },
    Rotate { angle: f32 },
    RotateAbout { pivot: Vec2, angle: f32 },
    CentralSym { center: Vec2 },
    AxialSym { point: Vec2, direction: Vec2 },
}

impl Transform {
    pub fn apply<T: Transformable + ?Sized>(&self, target: &mut T) {
        match *self {
            Transform::Translate(t) => target.translate(t),
            Transform::Homothety { ratio } => target.homothety(ratio),
            Transform::HomothetyAbout { pivot, ratio } => target.homothety_about(pivot, ratio),
            Transform::Rotate { angle } => target.rotate(angle),
            Transform::RotateAbout { pivot, angle } => target.rotate_about(pivot, angle),
            Transform::CentralSym { center } => target.central_sym(center),
            Transform::AxialSym { point, direction } => target.axial_sym(point, direction),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharedImage {
    inner: Arc<Mutex<Image>>,
}

impl SharedImage {
    pub fn new(image: Image) -> Self {
        Self {
            inner: Arc::new(Mutex::new(image)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Image>, ImageError> {
        self.inner.lock().map_err(|_| ImageError::Poisoned)
    }

    /// Run `f` with the image locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Image) -> R) -> Result<R, ImageError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Append a shape; returns its index.
    pub fn add_component(&self, shape: impl Into<Shape>) -> Result<usize, ImageError> {
        let mut image = self.lock()?;
        image.add_component(shape);
        Ok(image.len() - 1)
    }

    /// Apply `op` to the component at `index`.
    pub fn transform(&self, index: usize, op: &Transform) -> Result<(), ImageError> {
        let mut image = self.lock()?;
        let shape = image.component_mut(index)?;
        op.apply(shape);
        Ok(())
    }

    /// Apply `op` to the whole image.
    pub fn transform_all(&self, op: &Transform) -> Result<(), ImageError> {
        let mut image = self.lock()?;
        op.apply(&mut *image);
        Ok(())
    }

    pub fn delete_component(&self, index: usize) -> Result<Shape, ImageError> {
        self.lock()?.remove_component(index)
    }

    /// Snapshot of the component list.
    pub fn components(&self) -> Result<Vec<Shape>, ImageError> {
        Ok(self.lock()?.components().to_vec())
    }

    pub fn snapshot(&self) -> Result<Image, ImageError> {
        Ok(self.lock()?.clone())
    }

    pub fn replace(&self, image: Image) -> Result<(), ImageError> {
        *self.lock()? = image;
        Ok(())
    }

    pub fn serialize_for_send(&self) -> Result<String, ImageError> {
        Ok(self.lock()?.to_payload())
    }

    /// Rebuild the image from a received payload.
    ///
    /// On a decode error the shapes parsed before the bad token stay in the
    /// image and the error is returned.
    pub fn apply_received_payload(&self, payload: &str) -> Result<usize, ImageError> {
        let mut image = self.lock()?;
        Ok(image.deserialize(payload)?)
    }

    pub fn annotate(&self, text: impl Into<String>) -> Result<(), ImageError> {
        self.lock()?.annotate(text);
        Ok(())
    }

    pub fn annotation(&self) -> Result<String, ImageError> {
        Ok(self.lock()?.annotation().to_string())
    }

    pub fn bounding_box(&self) -> Result<BoundingBox, ImageError> {
        Ok(self.lock()?.bounding_box())
    }

    pub fn len(&self) -> Result<usize, ImageError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ImageError> {
        Ok(self.lock()?.is_empty())
    }
}

impl From<Image> for SharedImage {
    fn from(image: Image) -> Self {
        Self::new(image)
    }
}
