//! Rekord Model - RON model files
//!
//! A model file declares the entities a store serves:
//!
//! ```ron
//! (
//!     entities: [
//!         (
//!             name: "Person",
//!             attributes: { "id": Integer64, "name": String },
//!             relationships: { "pets": (destination: "Pet", to_many: true) },
//!             auto_increment: Some("id"),
//!             mappings: { "name": "full_name" },
//!         ),
//!     ],
//! )
//! ```
//!
//! A file may also hold a single entity on its own.

mod error;
mod loader;

pub use error::{Error, Result};
pub use loader::{load_model, ModelLoader};
