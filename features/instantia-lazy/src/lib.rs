//! Deferred, cancellable instantiation on top of `instantia-di`
//!
//! A [LazyServiceLoader] is registered like any other service. Awaiting
//! [LazyServiceLoader::get_instance] loads the module holding the implementation once, then builds
//! the instance through a child scope of the scope owning the loader.
//!
//! ```
//! use std::sync::Arc;
//! use futures::executor::block_on;
//! use instantia_di::{
//!     args, identifier_for, Constructor, DynError, InstantiationService, ServiceCollection,
//!     ServiceIdentifier, Signature,
//! };
//! use instantia_lazy::{CancellationToken, LazyServiceLoader, LoadedModule};
//!
//! fn lazy_answer_id() -> ServiceIdentifier<LazyServiceLoader<u64>> {
//!     identifier_for("lazyAnswer")
//! }
//!
//! let descriptor = LazyServiceLoader::<u64>::descriptor(|_: CancellationToken| async {
//!     let ctor = Constructor::from_fn("Answer", Signature::new(0), |_| {
//!         Ok::<_, DynError>(Arc::new(42_u64))
//!     })?;
//!     Ok::<_, DynError>(LoadedModule::Callable(ctor))
//! })
//! .unwrap();
//!
//! let mut services = ServiceCollection::new();
//! services.set(lazy_answer_id(), descriptor);
//! let scope = InstantiationService::new(services);
//!
//! let loader = scope.invoke_function(|accessor| accessor.get(lazy_answer_id())).unwrap();
//! assert!(!loader.loaded());
//! assert_eq!(*block_on(loader.get_instance(args![])).unwrap(), 42);
//! assert!(loader.loaded());
//! ```

pub mod base;
pub mod cancellation;
pub mod errors;
pub mod loader;
pub mod task;

pub use base::AsyncServiceBase;
pub use cancellation::{
    CancellationError, CancellationListener, CancellationToken, CancellationTokenSource,
    WaitForCancellation,
};
pub use errors::LazyLoadError;
pub use loader::{LazyServiceLoader, LoadedModule, ModuleSource};
pub use task::{create_cancelable_task, CancelableTask, TaskError, TaskState};
