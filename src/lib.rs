//! Declare tables once, then build parameterized SQL for them.
//!
//! Tables are declared through [`Table::builder`] into a [`Registry`].
//! Foreign keys can point to a table declared later, or in a module loaded
//! on demand, through a [`LazyTableReference`]. Queries are composed as
//! [`QueryString`]s and handed to an [`Engine`] for execution.
pub use tabula_core::*;
