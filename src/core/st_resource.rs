use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// `StResource` holds state that only the consumer thread may touch, such as
/// the drawable scene and its cached renders. Because it is built on `Rc` it is
/// neither `Send` nor `Sync`, so the compiler rejects any attempt to hand the
/// scene to a worker thread.
///
/// # Examples
///
/// ```
/// use live_preview::core::StResource;
///
/// let layers = StResource::new(vec![0, 3]);
/// let view = layers.clone();
///
/// layers.get_mut().push(5);
/// assert_eq!(view.get().len(), 3);
/// ```
///
/// # Panics
/// Borrow rules are checked at runtime: calling [`get_mut`] while another
/// borrow from the same resource is alive panics.
///
/// [`get_mut`]: StResource::get_mut
pub struct StResource<T> {
    resource: Rc<RefCell<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RefCell::new(resource)),
        }
    }

    /// Returns a shared borrow of the contained value.
    pub fn get(&self) -> Ref<'_, T> {
        self.resource.borrow()
    }

    /// Returns an exclusive borrow of the contained value.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.resource.borrow_mut()
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
