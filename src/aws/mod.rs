pub mod client;
pub mod instance;
