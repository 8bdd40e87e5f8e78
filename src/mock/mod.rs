pub mod signal;

pub use signal::{SignalConfig, SyntheticSource};
