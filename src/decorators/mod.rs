//! Loader decorators.
//!
//! A decorator wraps another loader and transforms the `(map, error)` pair
//! it produces. Decorators are independent of the source they wrap — any
//! loader composes with any decorator, and decorators nest freely. The
//! ownership guarantee of the wrapped loader extends to the decorator: the
//! map it transforms is already the caller's to mutate.

mod alias;
mod alter;
mod file_cache;
mod filter;
mod flatten;
mod ignore_error;

pub use alias::AliasLoader;
pub use alter::{to_int_list, to_string_list, AlterValueLoader};
pub use file_cache::FileCacheLoader;
pub use filter::{empty_value, exact_keys, key_with_prefix, key_with_suffix, Filter, FilterKvLoader};
pub use flatten::FlattenLoader;
pub use ignore_error::IgnoreErrorLoader;
