//! Rust types standing for persistent entities

use crate::naming::entity_name_of;

/// A Rust type that names a persistent entity
///
/// The default entity name is derived from the type name, so
/// `app::models::Person` and a generated `Person_Person` both map to
/// `"Person"`. Override [`Model::entity_name`] when the store uses a
/// different name.
pub trait Model: 'static {
    /// Entity name this type is stored under
    fn entity_name() -> String {
        entity_name_of::<Self>()
    }
}
