use std::sync::Arc;

use instantia_di::{DynError, InstantiationError};
use thiserror::Error;

use crate::{cancellation::CancellationError, task::TaskError};

/// Errors while lazily loading and building a service
#[derive(Error, Debug, Clone)]
pub enum LazyLoadError {
    /// The loader was disposed while its module was loading
    #[error(transparent)]
    Cancelled(#[from] CancellationError),

    #[error("Loading the module of '{service}' failed - error: {error}")]
    ModuleFailed {
        service: &'static str,
        error: Arc<DynError>,
    },

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    /// The scope owning the loader no longer exists
    #[error("The instantiation service owning the loader was dropped")]
    ScopeDropped,
}

impl LazyLoadError {
    pub(crate) fn from_task(service: &'static str, error: TaskError) -> Self {
        match error {
            TaskError::Cancelled(cancelled) => LazyLoadError::Cancelled(cancelled),
            TaskError::Failed(error) => LazyLoadError::ModuleFailed { service, error },
        }
    }
}
