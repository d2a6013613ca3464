//! Process-wide list of singleton services contributed by independent parts of an application.

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::{
    collection::ServiceCollection,
    constructor::Constructible,
    descriptor::SyncDescriptor,
    errors::DeclarationError,
    identifier::{ServiceId, ServiceIdentifier},
    types::Injectable,
};

/// When a registered singleton is expected to be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationType {
    /// Built as soon as something depends on it
    Eager,
    /// Marked as deferrable; it is still built on first use
    Delayed,
}

fn registry() -> &'static Mutex<Vec<(ServiceId, SyncDescriptor)>> {
    static REGISTRY: OnceLock<Mutex<Vec<(ServiceId, SyncDescriptor)>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Contributes `C` as the singleton implementation of `id`
pub fn register_singleton<T, C>(
    id: ServiceIdentifier<T>,
    instantiation: InstantiationType,
) -> Result<(), DeclarationError>
where
    T: ?Sized + Injectable,
    C: Constructible<Provides = T>,
{
    let mut descriptor = SyncDescriptor::of::<C>()?;
    if instantiation == InstantiationType::Delayed {
        descriptor = descriptor.delayed();
    }

    tracing::debug!(
        "Registered singleton '{id}' implemented by {}",
        descriptor.constructor().name()
    );
    registry().lock().push((id.id(), descriptor));
    Ok(())
}

/// All contributed singletons, in registration order
pub fn singleton_descriptors() -> Vec<(ServiceId, SyncDescriptor)> {
    registry().lock().clone()
}

impl ServiceCollection {
    /// Binds every contributed singleton, later contributions replacing earlier ones
    pub fn add_registered_singletons(&mut self) -> &mut Self {
        for (id, descriptor) in singleton_descriptors() {
            self.set(id, descriptor);
        }
        self
    }
}
