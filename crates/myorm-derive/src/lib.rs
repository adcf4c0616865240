//! Derive macros for myorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;
mod syn_types;

/// Derive the `Entity` field table for a struct.
///
/// # Example
///
/// ```ignore
/// use myorm::Entity;
///
/// #[derive(Default, Entity)]
/// struct Person {
///     #[orm(column = "id")]
///     id: i64,
///     #[orm(column)]
///     name: String,
///     #[orm(embed)]
///     audit: Audit,
///     #[orm(embed)]
///     extra: Option<Box<Extra>>,
///     cache_key: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to the named column
/// - `#[orm(column)]` - Map field to a column of the same name
/// - `#[orm(embed)]` - Flatten the columns of a nested `Entity` (`T`, `Option<T>` or `Option<Box<T>>`)
///
/// Fields without an `orm` attribute are not mapped.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
