use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

/// Errors returned by constructors and module loaders
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Scopes may be shared between threads,
/// so anything stored in them needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// A constructed service, or any other value handed to a constructor
///
/// Holds an `Arc<T>` behind `dyn Any`, where `T` is the contract the value was stored as.
/// `T` may be a trait object, so `Instance::from_arc(Arc::new(impl) as Arc<dyn Contract>)`
/// can later be downcast to `Arc<dyn Contract>`.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    /// Wraps an owned value
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value, keeping its identity
    pub fn from_arc<T: ?Sized + Injectable>(value: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(value),
        }
    }

    /// Returns the stored handle, or the name of the actually stored type
    pub fn downcast<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match self.instance.downcast_ref::<Arc<T>>() {
            Some(downcasted) => Ok(downcasted.clone()),
            None => Err(self.info.type_name),
        }
    }

    /// True if both instances are clones of the same stored value
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }
    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn downcast_returns_the_stored_handle() {
        let shared = Arc::new(42_u32);
        let instance = Instance::from_arc(shared.clone());

        let downcasted = instance.downcast::<u32>().unwrap();
        assert!(Arc::ptr_eq(&shared, &downcasted));
        assert_eq!(instance.downcast::<String>().unwrap_err(), "u32");
    }

    #[test]
    fn trait_objects_keep_their_contract() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let instance = Instance::from_arc(greeter);

        assert_eq!(instance.downcast::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(instance.downcast::<English>().is_err());
    }

    #[test]
    fn clones_share_identity() {
        let a = Instance::new("value".to_string());
        let b = a.clone();
        let c = Instance::new("value".to_string());

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
