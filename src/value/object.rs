use crate::refcount::Ref;

/// An opaque, caller-supplied value plus its teardown. Not hashable, not
/// equality-comparable except by identity (see [`crate::value::ref_equal`]).
/// This is the escape hatch generated code uses to stash boxed statements
/// or other host-side resources inside a row or a box.
pub struct CqlObject {
    data: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for CqlObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CqlObject").finish_non_exhaustive()
    }
}

impl CqlObject {
    /// Wraps `data`. `data`'s own `Drop` impl is the finalizer: it runs
    /// exactly once, when the last `Ref` to this object is released.
    pub fn new<T: 'static>(data: T) -> Ref<CqlObject> {
        Ref::new(CqlObject {
            data: Box::new(data),
        })
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}
