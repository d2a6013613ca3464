use std::{
    any::type_name,
    collections::HashSet,
    fmt::Debug,
    sync::{Arc, OnceLock, Weak},
    time::Instant,
};

use parking_lot::Mutex;

use crate::{
    collection::{ServiceCollection, ServiceEntry},
    constructor::{Argument, Arguments, Constructible, Constructor},
    dependency_graph::DependencyGraph,
    descriptor::SyncDescriptor,
    errors::InstantiationError,
    identifier::{identifier_for, ServiceId, ServiceIdentifier},
    options::InstantiationOptions,
    types::{Injectable, Instance},
};

/// Identifier under which every scope provides itself
///
/// Resolving it yields the [InstantiationService] performing the resolution.
///
/// A shared service keeping the resolved scope forms a reference cycle with the scope memoizing
/// it, so neither is ever dropped. Such services should keep a [WeakInstantiationService] from
/// [InstantiationService::downgrade] instead.
pub fn instantiation_service_identifier() -> ServiceIdentifier<InstantiationService> {
    static ID: OnceLock<ServiceIdentifier<InstantiationService>> = OnceLock::new();
    *ID.get_or_init(|| identifier_for("instantiationService"))
}

/// Builds services and their dependencies from a [ServiceCollection]
///
/// A scope owns one collection. Child scopes see all services of their ancestors, and may
/// shadow them with their own bindings.
///
/// Resolution is synchronous and runs to completion within one call.
#[derive(Clone)]
pub struct InstantiationService(Arc<ScopeInner>);
struct ScopeInner {
    services: Mutex<ServiceCollection>,
    parent: Option<InstantiationService>,
    options: InstantiationOptions,
    depth: usize,
}

/// Weak handle to an [InstantiationService]
///
/// Services which keep their scope around should hold this, as the scope in turn holds them.
#[derive(Clone)]
pub struct WeakInstantiationService(Weak<ScopeInner>);
impl WeakInstantiationService {
    pub fn upgrade(&self) -> Option<InstantiationService> {
        self.0.upgrade().map(InstantiationService)
    }
}

impl InstantiationService {
    pub fn new(services: ServiceCollection) -> Self {
        Self::with_options(services, InstantiationOptions::default())
    }

    pub fn with_options(services: ServiceCollection, options: InstantiationOptions) -> Self {
        tracing::debug!("Creating instantiation service with {} services", services.len());
        InstantiationService(Arc::new(ScopeInner {
            services: Mutex::new(services),
            parent: None,
            options,
            depth: 0,
        }))
    }

    /// Creates a child scope which inherits all current services and adds or overwrites the
    /// given ones
    pub fn create_child(&self, services: ServiceCollection) -> Self {
        let depth = self.0.depth + 1;
        tracing::debug!("Creating child scope at depth {depth} with {} services", services.len());
        InstantiationService(Arc::new(ScopeInner {
            services: Mutex::new(services),
            parent: Some(self.clone()),
            options: self.0.options,
            depth,
        }))
    }

    pub fn options(&self) -> InstantiationOptions {
        self.0.options
    }

    pub fn parent(&self) -> Option<&InstantiationService> {
        self.0.parent.as_ref()
    }

    pub fn downgrade(&self) -> WeakInstantiationService {
        WeakInstantiationService(Arc::downgrade(&self.0))
    }

    /// True if both handles point to the same scope
    pub fn ptr_eq(&self, other: &InstantiationService) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A copy of the bindings owned by this scope, without those of its ancestors
    pub fn snapshot(&self) -> ServiceCollection {
        self.0.services.lock().clone()
    }

    /// Snapshot of the dependencies between all services visible to this scope
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::new(self)
    }

    /// Builds `C`, resolving its declared dependencies
    ///
    /// `extra` fills the parameters without a declared dependency, in order.
    pub fn create_instance<C: Constructible>(
        &self,
        extra: Vec<Instance>,
    ) -> Result<Arc<C::Provides>, InstantiationError> {
        let ctor = Constructor::of::<C>()?;
        let instance = self.create_from_constructor(&ctor, extra)?;
        downcast(&instance)
    }

    /// Builds the service described by `descriptor`
    ///
    /// The static arguments of the descriptor come before `extra`. The result is not memoized.
    pub fn create_from_descriptor(
        &self,
        descriptor: &SyncDescriptor,
        extra: Vec<Instance>,
    ) -> Result<Instance, InstantiationError> {
        let mut path = ResolutionPath::default();
        self.construct(
            descriptor.constructor(),
            descriptor.static_arguments(),
            extra,
            &mut path,
        )
    }

    pub fn create_from_constructor(
        &self,
        ctor: &Constructor,
        extra: Vec<Instance>,
    ) -> Result<Instance, InstantiationError> {
        let mut path = ResolutionPath::default();
        self.construct(ctor, &[], extra, &mut path)
    }

    /// Calls `f` with an accessor resolving services from this scope
    pub fn invoke_function<R>(&self, f: impl FnOnce(&ServicesAccessor<'_>) -> R) -> R {
        let accessor = ServicesAccessor { scope: self };
        f(&accessor)
    }

    /// Each scope in the chain, starting with the root
    pub(crate) fn chain(&self) -> Vec<&InstantiationService> {
        let mut chain = vec![self];
        let mut scope = self;
        while let Some(parent) = scope.parent() {
            chain.push(parent);
            scope = parent;
        }
        chain.reverse();
        chain
    }
}

// Resolution
impl InstantiationService {
    fn construct(
        &self,
        ctor: &Constructor,
        leading: &[Instance],
        extra: Vec<Instance>,
        path: &mut ResolutionPath,
    ) -> Result<Instance, InstantiationError> {
        let started = self.0.options.trace.then(Instant::now);

        let mut slots: Vec<Option<Argument>> = vec![None; ctor.arity()];
        for dependency in ctor.dependencies() {
            let argument = match self.resolve(dependency.id, path)? {
                Some(instance) => Argument::Value(instance),
                None if dependency.optional => {
                    tracing::debug!(
                        "'{}' optionally depends on unknown service '{}'",
                        ctor.name(),
                        dependency.id
                    );
                    Argument::Missing
                }
                None => {
                    tracing::error!(
                        "'{}' depends on UNKNOWN service '{}'",
                        ctor.name(),
                        dependency.id
                    );
                    return Err(InstantiationError::UnknownService {
                        id: dependency.id,
                        required_by: ctor.name(),
                    });
                }
            };
            slots[dependency.index] = Some(argument);
        }

        let expected = ctor.arity() - ctor.dependencies().len();
        let supplied = leading.len() + extra.len();
        if expected != supplied {
            self.argument_count_mismatch(ctor, expected, supplied)?;
        }

        // Free parameters take the supplied arguments in order
        let mut supplied = leading.iter().cloned().chain(extra);
        let values = slots
            .into_iter()
            .map(|slot| match slot {
                Some(argument) => argument,
                None => supplied.next().map_or(Argument::Missing, Argument::Value),
            })
            .collect();

        let instance = ctor
            .construct(Arguments::new(ctor.name(), values))
            .map_err(|error| InstantiationError::ConstructionFailed {
                product: ctor.name(),
                error: Arc::new(error),
            })?;

        match started {
            Some(started) => tracing::debug!(
                "Constructed instance of {} in {:?}",
                ctor.name(),
                started.elapsed()
            ),
            None => tracing::trace!("Constructed instance of {}", ctor.name()),
        }
        Ok(instance)
    }

    fn argument_count_mismatch(
        &self,
        ctor: &Constructor,
        expected: usize,
        supplied: usize,
    ) -> Result<(), InstantiationError> {
        if self.0.options.strict {
            return Err(InstantiationError::ArgumentCountMismatch {
                target: ctor.name(),
                expected,
                supplied,
            });
        }

        tracing::warn!(
            "'{}' has {expected} non service parameters but {supplied} arguments were supplied",
            ctor.name()
        );
        Ok(())
    }

    /// Resolves a single service, `None` if it is bound nowhere in the scope chain
    fn resolve(
        &self,
        id: ServiceId,
        path: &mut ResolutionPath,
    ) -> Result<Option<Instance>, InstantiationError> {
        if path.contains(id) {
            return Err(InstantiationError::CyclicDependency {
                chain: path.cycle_through(id),
            });
        }

        if id == instantiation_service_identifier().id() {
            return Ok(Some(Instance::new(self.clone())));
        }

        let Some((owner, entry)) = self.lookup(id) else {
            tracing::trace!("Service '{id}' is not bound at depth {}", self.0.depth);
            return Ok(None);
        };

        match entry {
            ServiceEntry::Instance(instance) => Ok(Some(instance)),
            // Descriptors are built by the scope owning them, so a parent's singleton never
            // sees services shadowed by a child
            ServiceEntry::Descriptor(descriptor) => {
                owner.materialize(id, &descriptor, path).map(Some)
            }
        }
    }

    /// Finds the closest scope binding `id`
    fn lookup(&self, id: ServiceId) -> Option<(InstantiationService, ServiceEntry)> {
        let mut scope = self;
        loop {
            if let Some(entry) = scope.0.services.lock().get(id) {
                return Some((scope.clone(), entry.clone()));
            }
            scope = scope.0.parent.as_ref()?;
        }
    }

    /// Builds a descriptor bound in this scope and memoizes the result
    fn materialize(
        &self,
        id: ServiceId,
        descriptor: &SyncDescriptor,
        path: &mut ResolutionPath,
    ) -> Result<Instance, InstantiationError> {
        tracing::debug!(
            "Creating service '{id}' from {} at depth {}",
            descriptor.constructor().name(),
            self.0.depth
        );

        path.push(id);
        let created = self.construct(
            descriptor.constructor(),
            descriptor.static_arguments(),
            Vec::new(),
            path,
        );
        path.pop();
        let instance = created?;

        if !descriptor.is_shared() {
            return Ok(instance);
        }

        let mut services = self.0.services.lock();
        if let Some(ServiceEntry::Instance(existing)) = services.get(id) {
            // Another resolution committed first, keep a single instance
            return Ok(existing.clone());
        }
        services.set(id, instance.clone());
        Ok(instance)
    }
}

impl Debug for InstantiationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiationService")
            .field("depth", &self.0.depth)
            .field("services", &*self.0.services.lock())
            .finish()
    }
}

/// Resolves services while a function passed to [InstantiationService::invoke_function] runs
pub struct ServicesAccessor<'a> {
    scope: &'a InstantiationService,
}

impl ServicesAccessor<'_> {
    /// Resolves `id`, failing if it is bound nowhere in the scope chain
    pub fn get<T: ?Sized + Injectable>(
        &self,
        id: ServiceIdentifier<T>,
    ) -> Result<Arc<T>, InstantiationError> {
        self.get_optional(id)?.ok_or_else(|| {
            tracing::error!("Tried to access an unknown service '{id}'");
            InstantiationError::UnknownService {
                id: id.id(),
                required_by: "invoke_function",
            }
        })
    }

    /// Resolves `id`, `None` if it is bound nowhere in the scope chain
    pub fn get_optional<T: ?Sized + Injectable>(
        &self,
        id: ServiceIdentifier<T>,
    ) -> Result<Option<Arc<T>>, InstantiationError> {
        let mut path = ResolutionPath::default();
        match self.scope.resolve(id.id(), &mut path)? {
            Some(instance) => downcast(&instance).map(Some),
            None => Ok(None),
        }
    }
}

/// Services currently being materialized by one resolution call
#[derive(Default)]
struct ResolutionPath {
    chain: Vec<ServiceId>,
    active: HashSet<ServiceId>,
}

impl ResolutionPath {
    fn contains(&self, id: ServiceId) -> bool {
        self.active.contains(&id)
    }

    fn push(&mut self, id: ServiceId) {
        self.active.insert(id);
        self.chain.push(id);
    }

    fn pop(&mut self) {
        if let Some(id) = self.chain.pop() {
            self.active.remove(&id);
        }
    }

    /// The part of the path forming a cycle when `id` is requested again
    fn cycle_through(&self, id: ServiceId) -> Vec<ServiceId> {
        let start = self
            .chain
            .iter()
            .position(|entry| *entry == id)
            .unwrap_or(0);
        let mut cycle = self.chain[start..].to_vec();
        cycle.push(id);
        cycle
    }
}

fn downcast<T: ?Sized + Injectable>(instance: &Instance) -> Result<Arc<T>, InstantiationError> {
    instance
        .downcast()
        .map_err(|actual_type| InstantiationError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_path_reports_the_cycle_only() {
        let a = ServiceId::intern("instantiation.tests.a");
        let b = ServiceId::intern("instantiation.tests.b");
        let c = ServiceId::intern("instantiation.tests.c");

        let mut path = ResolutionPath::default();
        path.push(a);
        path.push(b);
        path.push(c);

        assert!(path.contains(b));
        assert_eq!(path.cycle_through(b), vec![b, c, b]);

        path.pop();
        assert!(!path.contains(c));
    }

    #[test]
    fn every_scope_provides_itself() {
        let root = InstantiationService::new(ServiceCollection::new());
        let child = root.create_child(ServiceCollection::new());

        let resolved = child.invoke_function(|accessor| {
            accessor.get(instantiation_service_identifier())
        });

        assert!(resolved.unwrap().ptr_eq(&child));
        assert!(child.parent().unwrap().ptr_eq(&root));
        assert_eq!(child.chain().len(), 2);
    }

    #[test]
    fn children_inherit_options() {
        let options = InstantiationOptions::new().strict(true).trace(true);
        let root = InstantiationService::with_options(ServiceCollection::new(), options);

        assert_eq!(root.create_child(ServiceCollection::new()).options(), options);
    }

    #[test]
    fn weak_handles_do_not_keep_the_scope_alive() {
        let scope = InstantiationService::new(ServiceCollection::new());
        let weak = scope.downgrade();

        assert!(weak.upgrade().is_some());
        drop(scope);
        assert!(weak.upgrade().is_none());
    }
}
