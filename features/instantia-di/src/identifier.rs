//! Interned service identifiers.
//!
//! A service identifier names a contract independent of its implementation. Identifiers are
//! interned by name for the lifetime of the process: asking twice for the same name yields the
//! same identifier, whatever contract type it is requested as.

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::OnceLock,
};

use parking_lot::Mutex;

/// Untyped, interned service identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId {
    index: usize,
    name: &'static str,
}
impl ServiceId {
    /// Interns `name`, returning the existing identifier if there is one
    pub fn intern(name: &str) -> ServiceId {
        let mut registry = registry().lock();
        if let Some(existing) = registry.get(name) {
            return *existing;
        }

        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let id = ServiceId {
            index: registry.len(),
            name,
        };
        registry.insert(name, id);
        tracing::trace!("Registered service identifier '{name}'");
        id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
impl Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
impl Debug for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceId").field(&self.name).finish()
    }
}

fn registry() -> &'static Mutex<HashMap<&'static str, ServiceId>> {
    static REGISTRY: OnceLock<Mutex<HashMap<&'static str, ServiceId>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Identifies a service with the contract `T`
///
/// `T` is only a compile time marker, it is usually a trait object (`dyn Greeter`) or the
/// concrete service type.
pub struct ServiceIdentifier<T: ?Sized> {
    id: ServiceId,
    _contract: PhantomData<fn() -> Box<T>>,
}

/// Creates the [ServiceIdentifier] interned under `name`
pub fn identifier_for<T: ?Sized>(name: &str) -> ServiceIdentifier<T> {
    ServiceIdentifier {
        id: ServiceId::intern(name),
        _contract: PhantomData,
    }
}

impl<T: ?Sized> ServiceIdentifier<T> {
    pub fn new(name: &str) -> Self {
        identifier_for(name)
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name
    }

    /// Narrows the declared contract of this identifier
    ///
    /// The interned identity is unchanged, only the compile time contract differs. Nothing
    /// checks that `U` is actually a refinement of `T`.
    pub fn refine<U: ?Sized>(self) -> ServiceIdentifier<U> {
        ServiceIdentifier {
            id: self.id,
            _contract: PhantomData,
        }
    }
}

impl<T: ?Sized> Clone for ServiceIdentifier<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized> Copy for ServiceIdentifier<T> {}
impl<T: ?Sized, U: ?Sized> PartialEq<ServiceIdentifier<U>> for ServiceIdentifier<T> {
    fn eq(&self, other: &ServiceIdentifier<U>) -> bool {
        self.id == other.id
    }
}
impl<T: ?Sized> Eq for ServiceIdentifier<T> {}
impl<T: ?Sized> Hash for ServiceIdentifier<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
impl<T: ?Sized> Debug for ServiceIdentifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceIdentifier")
            .field(&self.id.name)
            .finish()
    }
}
impl<T: ?Sized> Display for ServiceIdentifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.id, f)
    }
}
impl<T: ?Sized> From<ServiceIdentifier<T>> for ServiceId {
    fn from(identifier: ServiceIdentifier<T>) -> Self {
        identifier.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Refined {}

    #[test]
    fn same_name_interns_to_same_identifier() {
        let a = identifier_for::<String>("identifier.tests.same");
        let b = identifier_for::<u32>("identifier.tests.same");
        let c = identifier_for::<String>("identifier.tests.other");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.name(), "identifier.tests.same");
    }

    #[test]
    fn refine_keeps_identity() {
        let general = identifier_for::<dyn Send>("identifier.tests.refine");
        let refined = general.refine::<dyn Refined>();

        assert_eq!(general, refined);
        assert_eq!(refined.to_string(), "identifier.tests.refine");
    }

    #[test]
    fn identifiers_order_by_registration() {
        let first = ServiceId::intern("identifier.tests.order.first");
        let second = ServiceId::intern("identifier.tests.order.second");

        assert!(first < second);
        assert_eq!(ServiceId::intern("identifier.tests.order.first"), first);
    }

    #[test]
    fn interning_is_shared_between_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| ServiceId::intern("identifier.tests.threads")))
            .collect();

        let ids: Vec<ServiceId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
