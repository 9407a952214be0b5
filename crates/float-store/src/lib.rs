//! SQLite persistence for FLOAT: raw conversations in, assembled
//! FloatAST documents out, behind float-core's storage trait.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{Store, default_base_dir};
