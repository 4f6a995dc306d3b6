//! SharedRenderTarget - render target shared between renderer and capture
//!
//! The renderer holds the write lock while it draws a frame; capture holds the
//! read lock across both channel reads. Capture therefore sees either a fully
//! rendered frame or waits for the render in progress.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cloneable handle to a render target behind a reader/writer lock
#[derive(Debug)]
pub struct SharedRenderTarget<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> SharedRenderTarget<T> {
    pub fn new(target: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(target)),
        }
    }

    /// Lock for capture; blocks while a render holds the write lock
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Lock for rendering
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }
}

impl<T> Clone for SharedRenderTarget<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
