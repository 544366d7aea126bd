//! Sync hook for mirroring registry mutations.
//!
//! The registry knows nothing about durable storage. Every successful
//! register or update is passed to a [`SyncHook`] first; if the hook fails,
//! the in-memory index is left untouched.

use std::sync::Arc;

use crate::component::Component;
use crate::error::Result;

/// Mirror of registry mutations into some other store.
pub trait SyncHook: Send + Sync {
    /// Called with the component's new state before it is committed.
    fn sync(&self, component: &Component) -> Result<()>;
}

/// Hook that mirrors nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSync;

impl SyncHook for NoSync {
    fn sync(&self, _component: &Component) -> Result<()> {
        Ok(())
    }
}

impl<T: SyncHook + ?Sized> SyncHook for Arc<T> {
    fn sync(&self, component: &Component) -> Result<()> {
        (**self).sync(component)
    }
}

impl<T: SyncHook + ?Sized> SyncHook for Box<T> {
    fn sync(&self, component: &Component) -> Result<()> {
        (**self).sync(component)
    }
}
