use std::{any::type_name, fmt::Debug, sync::Arc};

use crate::{
    errors::{ArgumentError, DeclarationError},
    signature::{Dependency, Signature},
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// An implementation which can be instantiated by an [InstantiationService](crate::InstantiationService)
///
/// ```
/// # use std::sync::Arc;
/// # use instantia_di::{identifier_for, Arguments, Constructible, DynError, Signature};
/// trait Clock: Send + Sync {}
/// struct Scheduler {
///     name: Arc<String>,
///     clock: Arc<dyn Clock>,
/// }
///
/// impl Constructible for Scheduler {
///     type Provides = Scheduler;
///
///     fn signature() -> Signature {
///         Signature::new(2).inject(1, identifier_for::<dyn Clock>("clock"))
///     }
///
///     fn construct(args: Arguments) -> Result<Arc<Scheduler>, DynError> {
///         Ok(Arc::new(Scheduler {
///             name: args.get(0)?,
///             clock: args.get(1)?,
///         }))
///     }
/// }
/// ```
pub trait Constructible: 'static {
    /// The contract the constructed value is handed out as
    ///
    /// Either `Self` or a trait object implemented by `Self`
    type Provides: ?Sized + Injectable;

    /// Declares the parameters of the constructor
    fn signature() -> Signature;

    /// Constructs a new instance from fully resolved arguments
    fn construct(args: Arguments) -> Result<Arc<Self::Provides>, DynError>;
}

type ConstructFn = dyn Fn(Arguments) -> Result<Instance, DynError> + Send + Sync;

/// A type-erased, declared constructor
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorInner>);
struct ConstructorInner {
    name: &'static str,
    provides: TypeInfo,
    arity: usize,
    dependencies: Vec<Dependency>,
    construct: Box<ConstructFn>,
}

impl Constructor {
    /// Declares the constructor of `C`
    ///
    /// Fails if the signature of `C` declares a dependency on a position which is not a parameter.
    pub fn of<C: Constructible>() -> Result<Self, DeclarationError> {
        Self::from_fn(type_name::<C>(), C::signature(), C::construct)
    }

    /// Declares a constructor from a closure
    pub fn from_fn<T, F>(
        name: &'static str,
        signature: Signature,
        construct: F,
    ) -> Result<Self, DeclarationError>
    where
        T: ?Sized + Injectable,
        F: Fn(Arguments) -> Result<Arc<T>, DynError> + Send + Sync + 'static,
    {
        let arity = signature.arity();
        let dependencies = signature.into_dependencies(name)?;

        Ok(Constructor(Arc::new(ConstructorInner {
            name,
            provides: TypeInfo::of::<T>(),
            arity,
            dependencies,
            construct: Box::new(move |args| construct(args).map(Instance::from_arc)),
        })))
    }

    /// Name of the implementation
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    /// The contract constructed instances are stored as
    pub fn provides(&self) -> TypeInfo {
        self.0.provides
    }

    pub fn arity(&self) -> usize {
        self.0.arity
    }

    /// Declared service dependencies, ascending by parameter index
    pub fn dependencies(&self) -> &[Dependency] {
        &self.0.dependencies
    }

    pub(crate) fn construct(&self, args: Arguments) -> Result<Instance, DynError> {
        (self.0.construct)(args)
    }
}

impl Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.0.name)
            .field("provides", &self.0.provides.type_name)
            .field("arity", &self.0.arity)
            .field("dependencies", &self.0.dependencies)
            .finish()
    }
}

/// A single constructor argument
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Instance),
    /// An optional service which could not be resolved, or a parameter nothing was supplied for
    Missing,
}

/// Positional arguments handed to a constructor
#[derive(Debug, Clone)]
pub struct Arguments {
    target: &'static str,
    values: Vec<Argument>,
}

impl Arguments {
    pub(crate) fn new(target: &'static str, values: Vec<Argument>) -> Self {
        Arguments { target, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw argument at `index`
    pub fn argument(&self, index: usize) -> Result<&Argument, ArgumentError> {
        self.values.get(index).ok_or(ArgumentError::OutOfRange {
            target: self.target,
            index,
        })
    }

    pub fn is_missing(&self, index: usize) -> bool {
        matches!(self.values.get(index), None | Some(Argument::Missing))
    }

    /// The argument at `index`, failing on the missing marker
    pub fn get<T: ?Sized + Injectable>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        self.optional(index)?.ok_or(ArgumentError::Missing {
            target: self.target,
            index,
        })
    }

    /// The argument at `index`, `None` for the missing marker
    pub fn optional<T: ?Sized + Injectable>(
        &self,
        index: usize,
    ) -> Result<Option<Arc<T>>, ArgumentError> {
        match self.argument(index)? {
            Argument::Missing => Ok(None),
            Argument::Value(instance) => {
                instance
                    .downcast()
                    .map(Some)
                    .map_err(|actual| ArgumentError::WrongType {
                        target: self.target,
                        index,
                        expected: type_name::<T>(),
                        actual,
                    })
            }
        }
    }
}
