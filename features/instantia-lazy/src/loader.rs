use std::{any::type_name, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use instantia_di::{
    instantiation_service_identifier, Constructor, DeclarationError, DynError, Injectable,
    Instance, InstantiationService, Signature, SyncDescriptor,
};
use parking_lot::Mutex;

use crate::{
    base::AsyncServiceBase,
    cancellation::CancellationToken,
    errors::LazyLoadError,
    task::{create_cancelable_task, CancelableTask, TaskState},
};

/// The result of loading a module
#[derive(Debug, Clone)]
pub enum LoadedModule {
    /// A module exporting the constructor as its default
    Default(Constructor),
    /// A module which is the constructor itself
    Callable(Constructor),
}

impl LoadedModule {
    pub fn into_constructor(self) -> Constructor {
        match self {
            LoadedModule::Default(ctor) | LoadedModule::Callable(ctor) => ctor,
        }
    }
}

/// Acquires the module holding the implementation of a lazily loaded service
///
/// Implemented for any `Fn(CancellationToken) -> impl Future<Output = Result<LoadedModule, DynError>>`.
pub trait ModuleSource: Send + Sync + 'static {
    fn load(&self, token: CancellationToken) -> BoxFuture<'static, Result<LoadedModule, DynError>>;
}

impl<F, Fut> ModuleSource for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<LoadedModule, DynError>> + Send + 'static,
{
    fn load(&self, token: CancellationToken) -> BoxFuture<'static, Result<LoadedModule, DynError>> {
        self(token).boxed()
    }
}

/// A service whose implementation is loaded and built on first use
///
/// The loader itself is an ordinary service: register it with [LazyServiceLoader::descriptor]
/// and depend on it like on any other service. Its own instance is only created once
/// [get_instance](LazyServiceLoader::get_instance) is awaited.
///
/// Loading the module is single-flight: concurrent callers share one in-flight load, and the
/// first successful load is kept for good.
pub struct LazyServiceLoader<T: ?Sized + Injectable> {
    base: AsyncServiceBase<T>,
    source: Arc<dyn ModuleSource>,
    module: Mutex<Option<CancelableTask<Constructor>>>,
}

impl<T: ?Sized + Injectable> LazyServiceLoader<T> {
    pub fn new(scope: &InstantiationService, source: impl ModuleSource) -> Self {
        Self::with_source(scope, Arc::new(source))
    }

    fn with_source(scope: &InstantiationService, source: Arc<dyn ModuleSource>) -> Self {
        LazyServiceLoader {
            base: AsyncServiceBase::new(scope),
            source,
            module: Mutex::new(None),
        }
    }

    /// Describes a loader for `source`, built by the scope resolving it
    pub fn descriptor(source: impl ModuleSource) -> Result<SyncDescriptor, DeclarationError> {
        let source: Arc<dyn ModuleSource> = Arc::new(source);
        let ctor = Constructor::from_fn(
            type_name::<Self>(),
            Signature::new(1).inject(0, instantiation_service_identifier()),
            move |args| {
                let scope: Arc<InstantiationService> = args.get(0)?;
                Ok::<_, DynError>(Arc::new(Self::with_source(&scope, source.clone())))
            },
        )?;

        Ok(SyncDescriptor::new(ctor))
    }

    /// True once the instance has been built
    pub fn loaded(&self) -> bool {
        self.base.instance().is_some()
    }

    /// Loads the module and builds the instance, or returns the instance built before
    ///
    /// `extra` fills the non service parameters of the loaded constructor. It is ignored once
    /// the instance exists.
    pub async fn get_instance(&self, extra: Vec<Instance>) -> Result<Arc<T>, LazyLoadError> {
        if let Some(instance) = self.base.instance() {
            return Ok(instance);
        }

        let ctor = self.load_module().await?;
        self.base.create_instance(&ctor, extra)
    }

    /// Cancels an in-flight module load
    ///
    /// Every pending [get_instance](LazyServiceLoader::get_instance) fails with
    /// [LazyLoadError::Cancelled]; the next call loads again. Has no effect once the module was
    /// loaded.
    pub fn dispose(&self) {
        if let Some(task) = self.module.lock().as_ref() {
            task.cancel();
        }
    }

    async fn load_module(&self) -> Result<Constructor, LazyLoadError> {
        let task = self.module_task();
        let loaded = task.clone().await;

        if let Err(error) = &loaded {
            tracing::warn!("Loading the module of {} failed: {error}", type_name::<T>());
            // Forget the failed attempt so the next caller loads again
            let mut module = self.module.lock();
            if module.as_ref().is_some_and(|current| current.ptr_eq(&task)) {
                *module = None;
            }
        }

        loaded.map_err(|error| LazyLoadError::from_task(type_name::<T>(), error))
    }

    fn module_task(&self) -> CancelableTask<Constructor> {
        let mut module = self.module.lock();
        if let Some(task) = module.as_ref() {
            match task.state() {
                TaskState::Running | TaskState::Resolved => return task.clone(),
                // Settled without a module, possibly with nobody left awaiting it
                TaskState::Cancelled | TaskState::Rejected => {
                    tracing::debug!("Discarding the failed module load of {}", type_name::<T>());
                }
            }
        }

        tracing::debug!("Loading module of {}", type_name::<T>());
        let source = self.source.clone();
        let task = create_cancelable_task(move |token| async move {
            let module = source.load(token).await?;
            Ok::<_, DynError>(module.into_constructor())
        });

        *module = Some(task.clone());
        task
    }
}
