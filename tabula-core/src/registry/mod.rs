mod apps;
mod registry;

pub use apps::*;
pub use registry::*;
