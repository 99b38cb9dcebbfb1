use std::sync::Arc;

pub type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;
pub type ErrorFn<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

/// Observer with optional `next` and `error` callbacks.
pub struct PartialObserver<T, E> {
    pub next: Option<NextFn<T>>,
    pub error: Option<ErrorFn<E>>,
}

impl<T, E> PartialObserver<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_next<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.next = Some(Arc::new(callback));
        self
    }

    pub fn with_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(callback));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none() && self.error.is_none()
    }
}

impl<T, E> Clone for PartialObserver<T, E> {
    fn clone(&self) -> Self {
        Self {
            next: self.next.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T, E> Default for PartialObserver<T, E> {
    fn default() -> Self {
        Self {
            next: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_sets_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let observer: PartialObserver<u32, String> = PartialObserver::new().with_next(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        assert!(!observer.is_empty());
        assert!(observer.error.is_none());
        if let Some(next) = &observer.next {
            next(&3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
