pub mod config;
pub mod constants;
pub mod error;
pub mod primitives;

/// Returns true if the value is equal to its default.
pub(crate) fn is_default<T: Default + PartialEq>(t: &T) -> bool {
    t == &T::default()
}
