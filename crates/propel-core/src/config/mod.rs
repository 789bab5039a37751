//! Operator configuration for the promoter.

mod parser;
mod schema;

pub use parser::{parse_propel_toml, parse_propel_toml_str};
pub use schema::PropelConfig;
