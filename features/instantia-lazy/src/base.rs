use std::{
    any::type_name,
    sync::{Arc, OnceLock},
};

use instantia_di::{
    Constructor, Injectable, Instance, InstantiationError, InstantiationService,
    ServiceCollection, WeakInstantiationService,
};
use parking_lot::Mutex;

use crate::errors::LazyLoadError;

/// Holds a service which is built later, through the scope that owns the holder
///
/// The instance is built at most once, in a fresh child scope of the owning scope.
pub struct AsyncServiceBase<T: ?Sized + Injectable> {
    scope: WeakInstantiationService,
    instance: OnceLock<Arc<T>>,
    constructing: Mutex<()>,
}

impl<T: ?Sized + Injectable> AsyncServiceBase<T> {
    pub fn new(scope: &InstantiationService) -> Self {
        AsyncServiceBase {
            scope: scope.downgrade(),
            instance: OnceLock::new(),
            constructing: Mutex::new(()),
        }
    }

    /// The built instance, if any
    pub fn instance(&self) -> Option<Arc<T>> {
        self.instance.get().cloned()
    }

    /// Builds the instance from `ctor`, or returns the one built before
    pub fn create_instance(
        &self,
        ctor: &Constructor,
        extra: Vec<Instance>,
    ) -> Result<Arc<T>, LazyLoadError> {
        let _constructing = self.constructing.lock();
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }

        let scope = self.scope.upgrade().ok_or(LazyLoadError::ScopeDropped)?;
        let child = scope.create_child(ServiceCollection::new());
        let instance = child
            .create_from_constructor(ctor, extra)?
            .downcast::<T>()
            .map_err(|actual_type| InstantiationError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })?;

        tracing::debug!("Lazily created {}", ctor.name());
        Ok(self.instance.get_or_init(|| instance).clone())
    }
}

#[cfg(test)]
mod tests {
    use instantia_di::{args, DynError, Signature};

    use super::*;

    fn counter() -> Constructor {
        Constructor::from_fn("Counter", Signature::new(1), |args| {
            let start: Arc<u32> = args.get(0)?;
            Ok::<_, DynError>(Arc::new(*start + 1))
        })
        .unwrap()
    }

    #[test]
    fn builds_once() {
        let scope = InstantiationService::new(ServiceCollection::new());
        let base = AsyncServiceBase::<u32>::new(&scope);

        let first = base.create_instance(&counter(), args![1_u32]).unwrap();
        let second = base.create_instance(&counter(), args![10_u32]).unwrap();

        assert_eq!(*first, 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(base.instance().is_some());
    }

    #[test]
    fn fails_without_scope() {
        let scope = InstantiationService::new(ServiceCollection::new());
        let base = AsyncServiceBase::<u32>::new(&scope);
        drop(scope);

        assert!(matches!(
            base.create_instance(&counter(), args![1_u32]),
            Err(LazyLoadError::ScopeDropped)
        ));
        assert!(base.instance().is_none());
    }

    #[test]
    fn reports_mismatched_constructors() {
        let scope = InstantiationService::new(ServiceCollection::new());
        let base = AsyncServiceBase::<String>::new(&scope);

        assert!(matches!(
            base.create_instance(&counter(), args![1_u32]),
            Err(LazyLoadError::Instantiation(
                InstantiationError::DowncastFailed { .. }
            ))
        ));
    }
}
