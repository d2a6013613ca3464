use std::sync::Arc;

use thiserror::Error;

use crate::{identifier::ServiceId, types::DynError};

/// Errors while instantiating a service graph
#[derive(Error, Debug, Clone)]
pub enum InstantiationError {
    /// A service (transitively) depends on itself
    #[error("A cyclic dependency exists between services: {}", display_chain(.chain))]
    CyclicDependency { chain: Vec<ServiceId> },

    /// A required dependency has no binding in the scope chain
    #[error("'{required_by}' depends on UNKNOWN service '{id}'")]
    UnknownService {
        id: ServiceId,
        required_by: &'static str,
    },

    /// The dependency declaration of a constructor is invalid
    #[error(transparent)]
    DecoratorMisuse(#[from] DeclarationError),

    /// The resolved value was stored as another type
    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// A constructor returned an error
    #[error("Constructor for '{product}' failed - error: {error}")]
    ConstructionFailed {
        product: &'static str,
        error: Arc<DynError>,
    },

    /// Number of supplied arguments does not match the free constructor parameters.
    /// Only raised in strict mode.
    #[error("'{target}' has {expected} non service parameters but {supplied} arguments were supplied")]
    ArgumentCountMismatch {
        target: &'static str,
        expected: usize,
        supplied: usize,
    },
}

/// Errors in a dependency declaration, raised when a constructor is declared
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// A dependency was declared on a position that is not a constructor parameter
    #[error("'{target}' declares a dependency at index {index}, but only has {arity} parameters")]
    NotAParameter {
        target: &'static str,
        index: usize,
        arity: usize,
    },
}

/// Errors when a constructor reads its arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("'{target}' has no parameter at index {index}")]
    OutOfRange { target: &'static str, index: usize },

    #[error("'{target}' received the missing marker at index {index}")]
    Missing { target: &'static str, index: usize },

    #[error("'{target}' expected '{expected}' at index {index} but got '{actual}'")]
    WrongType {
        target: &'static str,
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

fn display_chain(chain: &[ServiceId]) -> String {
    chain
        .iter()
        .map(ServiceId::name)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_names_the_path() {
        let a = ServiceId::intern("errors.tests.a");
        let b = ServiceId::intern("errors.tests.b");
        let error = InstantiationError::CyclicDependency {
            chain: vec![a, b, a],
        };

        assert_eq!(
            error.to_string(),
            "A cyclic dependency exists between services: errors.tests.a -> errors.tests.b -> errors.tests.a"
        );
    }
}
