//! Instantia DI builds object graphs from interned service identifiers.
//!
//! Instantia DI is split into the following parts:
//! 1. Identifiers: interned names for service contracts ([identifier_for])
//! 2. Constructors: implementations declaring which parameters are injected services
//!    ([Constructible], [Signature])
//! 3. ServiceCollection: bindings from identifiers to instances or [SyncDescriptor]s
//! 4. InstantiationService: resolves and builds services, memoizing descriptors, with child
//!    scopes shadowing their parents
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use instantia_di::{
//!     args, identifier_for, Arguments, Constructible, DynError, InstantiationService,
//!     ServiceCollection, ServiceIdentifier, Signature, SyncDescriptor,
//! };
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//! fn greeter_id() -> ServiceIdentifier<dyn Greeter> {
//!     identifier_for("greeter")
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "Hello".to_string()
//!     }
//! }
//! impl Constructible for English {
//!     type Provides = dyn Greeter;
//!
//!     fn signature() -> Signature {
//!         Signature::new(0)
//!     }
//!
//!     fn construct(_: Arguments) -> Result<Arc<dyn Greeter>, DynError> {
//!         Ok(Arc::new(English))
//!     }
//! }
//!
//! struct Welcome {
//!     name: Arc<String>,
//!     greeter: Arc<dyn Greeter>,
//! }
//! impl Constructible for Welcome {
//!     type Provides = Welcome;
//!
//!     fn signature() -> Signature {
//!         Signature::new(2).inject(1, greeter_id())
//!     }
//!
//!     fn construct(args: Arguments) -> Result<Arc<Welcome>, DynError> {
//!         Ok(Arc::new(Welcome { name: args.get(0)?, greeter: args.get(1)? }))
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.set(greeter_id(), SyncDescriptor::of::<English>().unwrap());
//!
//! let scope = InstantiationService::new(services);
//! let welcome = scope.create_instance::<Welcome>(args!["World".to_string()]).unwrap();
//! assert_eq!(format!("{} {}", welcome.greeter.greet(), welcome.name), "Hello World");
//! ```

pub mod collection;
pub mod constructor;
pub mod dependency_graph;
pub mod descriptor;
pub mod errors;
pub mod extensions;
pub mod identifier;
pub mod instantiation;
mod macros;
pub mod options;
pub mod signature;
pub mod types;

pub use collection::{ServiceCollection, ServiceEntry};
pub use constructor::{Argument, Arguments, Constructible, Constructor};
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use descriptor::SyncDescriptor;
pub use errors::{ArgumentError, DeclarationError, InstantiationError};
pub use extensions::{register_singleton, singleton_descriptors, InstantiationType};
pub use identifier::{identifier_for, ServiceId, ServiceIdentifier};
pub use instantiation::{
    instantiation_service_identifier, InstantiationService, ServicesAccessor,
    WeakInstantiationService,
};
pub use options::InstantiationOptions;
pub use signature::{Dependency, Signature};
pub use types::{DynError, Injectable, Instance, TypeInfo};
