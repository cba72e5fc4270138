pub mod defaults;
pub mod list;
pub mod schema;
pub mod simulate;
