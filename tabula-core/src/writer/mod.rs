mod context;
mod sql_writer;
mod sqlite;

pub use context::*;
pub use sql_writer::*;
pub use sqlite::*;
