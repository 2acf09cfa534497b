//! A calculator served over `rpc_lite`.
//!
//! - `calculator` - the four arithmetic operations and their registration
//! - `proxy` - a typed client whose methods are remote calls
//! - `prompt` - input parsing for the interactive client

pub mod calculator;
pub mod prompt;
pub mod proxy;

pub use calculator::{Arithmetic, register_calculator};
pub use proxy::CalculatorClient;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
