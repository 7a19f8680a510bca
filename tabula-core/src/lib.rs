mod as_value;
mod column;
mod config;
mod engine;
mod error;
mod expression;
mod query;
mod query_string;
mod record;
mod reference;
mod registry;
mod table;
mod util;
mod value;
mod writer;

pub use as_value::*;
pub use column::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use expression::*;
pub use query::*;
pub use query_string::*;
pub use record::*;
pub use reference::*;
pub use registry::*;
pub use table::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
