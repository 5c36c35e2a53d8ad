pub mod client;
pub mod error;
pub mod gateway;
pub mod signature;
pub mod types;
pub mod utils;
