//! Reference-counted hot-swap holder.
//!
//! Acquire increments the count; release decrements and, if the count has
//! reached zero *and* the holder is marked for collection, runs the cleanup
//! closure exactly once. Swap never goes through this type; the caller (the
//! browser supervisor) marks the old holder once it has installed a new
//! one.

use std::sync::Arc;

use parking_lot::Mutex;

struct Inner<T> {
    value: Option<T>,
    count: usize,
    marked: bool,
}

/// A guard returned by `acquire`. Dropping it releases the reference. The
/// held value is accessed through `with` rather than `Deref` so that the
/// lock is only ever taken for the duration of one closure call.
pub struct Ref<T> {
    holder: Holder<T>,
}

impl<T> Ref<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let inner = self.holder.inner.lock();
        let value = inner.value.as_ref().expect("value present while count > 0");
        f(value)
    }
}

#[derive(Clone)]
pub struct Holder<T> {
    inner: Arc<Mutex<Inner<T>>>,
    cleanup: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Holder<T> {
    pub fn new(value: T, cleanup: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: Some(value),
                count: 0,
                marked: false,
            })),
            cleanup: Arc::new(cleanup),
        }
    }

    /// Increment the reference count and return a guard, unless this holder
    /// has already been marked for collection.
    pub fn acquire(&self) -> Option<Ref<T>> {
        let mut inner = self.inner.lock();
        if inner.marked {
            return None;
        }
        inner.count += 1;
        drop(inner);
        Some(Ref {
            holder: self.clone(),
        })
    }

    /// Mark this holder for collection. If the count is already zero,
    /// cleanup runs immediately; otherwise it runs when the last `Ref`
    /// drops.
    pub fn mark_for_collection(&self) {
        let mut inner = self.inner.lock();
        if inner.marked {
            return;
        }
        inner.marked = true;
        if inner.count == 0 {
            let value = inner.value.take().expect("value present exactly once");
            drop(inner);
            (self.cleanup)(value);
        }
    }

    pub fn is_marked(&self) -> bool {
        self.inner.lock().marked
    }

    fn release(&self) {
        let mut inner = self.inner.lock();
        inner.count -= 1;
        if inner.count == 0 && inner.marked && inner.value.is_some() {
            let value = inner.value.take().expect("checked is_some above");
            drop(inner);
            (self.cleanup)(value);
        }
    }
}

impl<T> Drop for Ref<T> {
    fn drop(&mut self) {
        self.holder.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cleanup_runs_once_after_mark_and_drain() {
        let cleaned = Arc::new(AtomicUsize::new(0));
        let c = cleaned.clone();
        let holder = Holder::new(42, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let a = holder.acquire().expect("not yet marked");
        let b = holder.acquire().expect("not yet marked");
        holder.mark_for_collection();
        assert_eq!(cleaned.load(Ordering::SeqCst), 0);

        drop(a);
        assert_eq!(cleaned.load(Ordering::SeqCst), 0);
        drop(b);
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mark_with_zero_outstanding_cleans_up_immediately() {
        let cleaned = Arc::new(AtomicUsize::new(0));
        let c = cleaned.clone();
        let holder = Holder::new(1, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        holder.mark_for_collection();
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn acquire_after_mark_fails() {
        let holder = Holder::new(1, |_| {});
        holder.mark_for_collection();
        assert!(holder.acquire().is_none());
    }
}
