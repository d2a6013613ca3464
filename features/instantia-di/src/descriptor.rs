use crate::{
    constructor::{Constructible, Constructor},
    errors::DeclarationError,
    types::Instance,
};

/// Describes how to build a service, without building it yet
///
/// Stored in a [ServiceCollection](crate::ServiceCollection), a descriptor is replaced by the
/// instance it produced on first resolution, unless it is [transient](SyncDescriptor::transient).
#[derive(Debug, Clone)]
pub struct SyncDescriptor {
    ctor: Constructor,
    static_arguments: Vec<Instance>,
    shared: bool,
    delayed: bool,
}

impl SyncDescriptor {
    pub fn new(ctor: Constructor) -> Self {
        SyncDescriptor {
            ctor,
            static_arguments: Vec::new(),
            shared: true,
            delayed: false,
        }
    }

    /// Describes the constructor of `C`
    pub fn of<C: Constructible>() -> Result<Self, DeclarationError> {
        Ok(Self::new(Constructor::of::<C>()?))
    }

    /// Arguments placed before any extra arguments supplied at instantiation
    pub fn with_arguments(mut self, static_arguments: Vec<Instance>) -> Self {
        self.static_arguments = static_arguments;
        self
    }

    /// Build a new instance on every resolution instead of memoizing the first one
    pub fn transient(mut self) -> Self {
        self.shared = false;
        self
    }

    /// Marks the descriptor as registered for delayed instantiation
    pub fn delayed(mut self) -> Self {
        self.delayed = true;
        self
    }

    pub fn constructor(&self) -> &Constructor {
        &self.ctor
    }

    pub fn static_arguments(&self) -> &[Instance] {
        &self.static_arguments
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn supports_delayed_instantiation(&self) -> bool {
        self.delayed
    }
}

impl From<Constructor> for SyncDescriptor {
    fn from(ctor: Constructor) -> Self {
        SyncDescriptor::new(ctor)
    }
}
