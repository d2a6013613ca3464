/// Wraps each value into an [Instance](crate::Instance), for use as extra or static
/// constructor arguments.
///
/// ```
/// # use instantia_di::args;
/// let extra = args!["name".to_string(), 8080_u16];
/// assert_eq!(extra.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Instance>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Instance::new($value)),+]
    };
}
