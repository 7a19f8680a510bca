mod column;
mod column_def;
mod column_type;

pub use column::*;
pub use column_def::*;
pub use column_type::*;
