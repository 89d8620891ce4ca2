use crate::{module_instance::ModuleInstance, store::Store};

/// What a host function sees when it is called back into from the interpreter
///: the store it can resolve handles against, and the
/// calling module instance whose memories/tables/globals it may reach into.
pub struct CallingFrame<'a> {
    store: &'a mut Store,
    instance: Option<ModuleInstance>,
}

impl<'a> CallingFrame<'a> {
    pub(crate) fn new(store: &'a mut Store, instance: Option<ModuleInstance>) -> Self {
        Self { store, instance }
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        self.store
    }

    /// The module instance that made this call, or `None` when the host function
    /// was invoked directly from outside any module.
    pub fn instance(&self) -> Option<&ModuleInstance> {
        self.instance.as_ref()
    }
}
