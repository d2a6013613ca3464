use std::collections::BTreeMap;

use crate::{
    errors::DeclarationError,
    identifier::{ServiceId, ServiceIdentifier},
};

/// A service dependency of a constructor parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// The required service
    pub id: ServiceId,
    /// Position of the parameter receiving the service
    pub index: usize,
    /// Optional dependencies receive the missing marker if unresolved
    pub optional: bool,
}

/// Declares which parameters of a constructor are injected services
///
/// ```
/// # use instantia_di::{identifier_for, Signature};
/// # trait Storage {}
/// # trait Telemetry {}
/// // fn new(name: String, storage: Storage, telemetry: Option<Telemetry>)
/// let signature = Signature::new(3)
///     .inject(1, identifier_for::<dyn Storage>("storage"))
///     .optional(2, identifier_for::<dyn Telemetry>("telemetry"));
/// ```
///
/// Parameters without a declaration are filled with the static and extra arguments given at
/// instantiation, in order.
#[derive(Debug, Clone)]
pub struct Signature {
    arity: usize,
    dependencies: BTreeMap<usize, Dependency>,
    misplaced: Option<usize>,
}

impl Signature {
    /// A constructor taking `arity` parameters
    pub fn new(arity: usize) -> Self {
        Signature {
            arity,
            dependencies: BTreeMap::new(),
            misplaced: None,
        }
    }

    /// Inject the service `id` at `index`
    pub fn inject<T: ?Sized>(self, index: usize, id: ServiceIdentifier<T>) -> Self {
        self.declare(index, id.id(), false)
    }

    /// Inject the service `id` at `index`, or the missing marker if it is not bound
    pub fn optional<T: ?Sized>(self, index: usize, id: ServiceIdentifier<T>) -> Self {
        self.declare(index, id.id(), true)
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    fn declare(mut self, index: usize, id: ServiceId, optional: bool) -> Self {
        if index >= self.arity {
            // Reported when the constructor is declared
            self.misplaced.get_or_insert(index);
            return self;
        }

        // Re-declaring a position replaces the previous declaration
        self.dependencies
            .insert(index, Dependency { id, index, optional });
        self
    }

    /// Validates the declaration, returning the dependencies in ascending index order
    pub(crate) fn into_dependencies(
        self,
        target: &'static str,
    ) -> Result<Vec<Dependency>, DeclarationError> {
        if let Some(index) = self.misplaced {
            return Err(DeclarationError::NotAParameter {
                target,
                index,
                arity: self.arity,
            });
        }

        Ok(self.dependencies.into_values().collect())
    }
}
