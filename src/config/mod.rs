mod settings;

pub use settings::{Config, REQUIRED_KEYS};
