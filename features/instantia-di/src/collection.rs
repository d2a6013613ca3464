use std::{collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    descriptor::SyncDescriptor,
    identifier::{ServiceId, ServiceIdentifier},
    types::{Injectable, Instance},
};

/// A service binding, either built or still to be built
#[derive(Debug, Clone)]
pub enum ServiceEntry {
    Instance(Instance),
    Descriptor(SyncDescriptor),
}
impl From<Instance> for ServiceEntry {
    fn from(instance: Instance) -> Self {
        ServiceEntry::Instance(instance)
    }
}
impl From<SyncDescriptor> for ServiceEntry {
    fn from(descriptor: SyncDescriptor) -> Self {
        ServiceEntry::Descriptor(descriptor)
    }
}

/// Ordered map of service bindings
///
/// Holds at most one entry per identifier. Setting an identifier again replaces the entry in
/// place, so iteration order stays the order identifiers were first bound in.
#[derive(Default, Clone)]
pub struct ServiceCollection {
    entries: Vec<(ServiceId, ServiceEntry)>,
    positions: HashMap<ServiceId, usize>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `entries`, later duplicates replacing earlier ones
    pub fn from_entries(entries: impl IntoIterator<Item = (ServiceId, ServiceEntry)>) -> Self {
        let mut collection = Self::new();
        for (id, entry) in entries {
            collection.set(id, entry);
        }
        collection
    }

    /// Binds `id`, returning the previous binding
    pub fn set(
        &mut self,
        id: impl Into<ServiceId>,
        entry: impl Into<ServiceEntry>,
    ) -> Option<ServiceEntry> {
        let id = id.into();
        let entry = entry.into();
        match self.positions.get(&id) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, entry)),
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push((id, entry));
                None
            }
        }
    }

    /// Binds `id` to an existing instance
    pub fn set_instance<T: ?Sized + Injectable>(
        &mut self,
        id: ServiceIdentifier<T>,
        instance: Arc<T>,
    ) -> Option<ServiceEntry> {
        self.set(id, Instance::from_arc(instance))
    }

    pub fn get(&self, id: impl Into<ServiceId>) -> Option<&ServiceEntry> {
        let position = *self.positions.get(&id.into())?;
        Some(&self.entries[position].1)
    }

    pub fn has(&self, id: impl Into<ServiceId>) -> bool {
        self.positions.contains_key(&id.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ServiceId, &ServiceEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }
}

impl FromIterator<(ServiceId, ServiceEntry)> for ServiceCollection {
    fn from_iter<I: IntoIterator<Item = (ServiceId, ServiceEntry)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (id, entry) in &self.entries {
            let val = match entry {
                ServiceEntry::Instance(_) => "instance",
                ServiceEntry::Descriptor(_) => "descriptor",
            };
            map.entry(&id.name(), &val);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::identifier_for;

    #[test]
    fn set_returns_the_previous_binding() {
        let id = identifier_for::<u32>("collection.tests.previous");
        let mut collection = ServiceCollection::new();

        assert!(collection.set_instance(id, Arc::new(1)).is_none());
        let previous = collection.set_instance(id, Arc::new(2)).unwrap();

        let ServiceEntry::Instance(previous) = previous else {
            panic!("expected an instance");
        };
        assert_eq!(*previous.downcast::<u32>().unwrap(), 1);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn overwriting_keeps_insertion_order() {
        let a = identifier_for::<u32>("collection.tests.order.a");
        let b = identifier_for::<u32>("collection.tests.order.b");
        let c = identifier_for::<u32>("collection.tests.order.c");

        let mut collection = ServiceCollection::from_entries([
            (a.id(), Instance::new(1_u32).into()),
            (b.id(), Instance::new(2_u32).into()),
        ]);
        collection.set(c, Instance::new(3_u32));
        collection.set(a, Instance::new(4_u32));

        let order: Vec<ServiceId> = collection.iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a.id(), b.id(), c.id()]);

        let Some(ServiceEntry::Instance(first)) = collection.get(a) else {
            panic!("expected an instance");
        };
        assert_eq!(*first.downcast::<u32>().unwrap(), 4);
    }

    #[test]
    fn get_is_local_only() {
        let id = identifier_for::<u32>("collection.tests.local");
        let collection = ServiceCollection::new();

        assert!(collection.get(id).is_none());
        assert!(!collection.has(id));
        assert!(collection.is_empty());
    }
}
