use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A thread-safe, reference-counted value guarded by a mutex and paired with
/// a condition variable.
///
/// `MtResource` is the shared state primitive behind the task pool: the
/// in-flight registry, the event bridge queue and each task's outcome slot all
/// live in one. Workers mutate the value and call [`notify_all`] so a thread
/// blocked in [`wait_until`] wakes up and re-checks its predicate.
///
/// Lock poisoning is recovered rather than propagated. A runnable panics on a
/// worker thread only inside `catch_unwind`, never while holding one of these
/// guards, so the guarded data is always structurally valid.
///
/// # Examples
///
/// ```
/// use live_preview::core::MtResource;
/// use std::thread;
///
/// let frames = MtResource::new(0u32);
/// let producer = frames.clone();
///
/// let handle = thread::spawn(move || {
///     *producer.get_mut() += 1;
///     producer.notify_all();
/// });
///
/// let (count, _) = frames.wait_until(std::time::Duration::from_secs(1), |n| *n > 0);
/// assert_eq!(*count, 1);
/// handle.join().unwrap();
/// ```
///
/// [`notify_all`]: MtResource::notify_all
/// [`wait_until`]: MtResource::wait_until
pub struct MtResource<T: Send> {
    inner: Arc<(Mutex<T>, Condvar)>,
}

impl<T: Send> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            inner: Arc::new((Mutex::new(resource), Condvar::new())),
        }
    }

    /// Locks the value for reading.
    pub fn get(&self) -> MutexGuard<'_, T> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the value for writing.
    ///
    /// Same lock as [`get`](MtResource::get); the two names only document
    /// intent at the call site.
    pub fn get_mut(&self) -> MutexGuard<'_, T> {
        self.get()
    }

    /// Wakes every thread blocked in [`wait_until`](MtResource::wait_until).
    pub fn notify_all(&self) {
        self.inner.1.notify_all();
    }

    /// Blocks until `ready` returns true or `timeout` elapses.
    ///
    /// # Returns
    /// The guard, and `true` if the wait timed out with the predicate still
    /// false.
    pub fn wait_until<F>(
        &self,
        timeout: std::time::Duration,
        mut ready: F,
    ) -> (MutexGuard<'_, T>, bool)
    where
        F: FnMut(&T) -> bool,
    {
        let guard = self.get();
        let (guard, result) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |value| !ready(value))
            .unwrap_or_else(PoisonError::into_inner);
        (guard, result.timed_out())
    }
}

impl<T: Send> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
