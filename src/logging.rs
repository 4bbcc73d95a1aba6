// ABOUTME: Logging configuration and structured logging setup
// ABOUTME: Configures log levels and output formats from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured logging setup built on `tracing-subscriber`.

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON for production log aggregation
    Json,
    /// Pretty for development
    Pretty,
    /// Compact for space-constrained environments
    Compact,
}

impl LogFormat {
    fn from_env() -> Self {
        match env::var("LOG_FORMAT").unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global subscriber from `RUST_LOG` and `LOG_FORMAT`.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_from_env() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match LogFormat::from_env() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_current_span(false))
                .try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init()?;
        }
    }

    Ok(())
}
