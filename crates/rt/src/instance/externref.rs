use std::any::Any;
use std::sync::Arc;

/// The host-owned payload behind an `externref` value.
///
/// Held by `Arc` rather than by value: an `externref` is a handle the guest
/// passes around, never a value it can inspect, so cloning a [`crate::value::Val`]
/// must never clone the underlying host object.
#[derive(Clone)]
pub struct ExternObject(Arc<dyn Any + Send + Sync>);

impl ExternObject {
    pub fn new<T: Any + Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl std::fmt::Debug for ExternObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExternObject").finish()
    }
}
