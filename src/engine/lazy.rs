use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A collaborator built on first access and kept until released.
///
/// The slot lock is held while the loader runs, so concurrent first accesses
/// build the value once. A loader must not read its own slot.
pub(crate) struct LazySlot<T: ?Sized> {
    value: Mutex<Option<Arc<T>>>,
}

impl<T: ?Sized> LazySlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.lock().clone()
    }

    pub(crate) fn get_or_init(&self, init: impl FnOnce() -> Arc<T>) -> Arc<T> {
        let mut slot = self.lock();
        slot.get_or_insert_with(init).clone()
    }

    /// Like [`get_or_init`](Self::get_or_init) for optional capabilities: `None` from the
    /// loader leaves the slot empty.
    pub(crate) fn get_or_try_init(&self, init: impl FnOnce() -> Option<Arc<T>>) -> Option<Arc<T>> {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = init();
        }
        slot.clone()
    }

    /// Fallible build: an `Err` from the loader is returned and the slot stays empty.
    pub(crate) fn try_get_or_init<E>(
        &self,
        init: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        let mut slot = self.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = init()?;
        *slot = Some(value.clone());
        Ok(value)
    }

    pub(crate) fn release(&self) -> Option<Arc<T>> {
        self.lock().take()
    }
}
