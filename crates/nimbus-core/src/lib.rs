pub mod config;
pub mod constants;
pub mod errors;
pub mod inventory;
pub mod logging;
pub mod model;
