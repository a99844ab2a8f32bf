//! CLI command implementations

pub mod config;
pub mod get;
pub mod images;
pub mod stage;
pub mod status;

pub use config::execute as config;
pub use get::execute as get;
pub use images::execute as images;
pub use stage::execute as stage;
pub use status::execute as status;
