#![doc(test(attr(deny(warnings))))]

//! Rendiconti is the client for Italian support-administration reports
//! ("amministrazione di sostegno"). It wires the HTTP backend, the stores,
//! the report editor and the PDF export into one [`app::Application`].

pub mod app;
pub mod errors;
pub mod export;
pub mod utils;

pub use ads_config as config;
pub use ads_core as core;
pub use ads_domain as domain;
pub use ads_http as http;
pub use ads_pdf as pdf;

pub use app::Application;
pub use errors::{AppError, AppResult};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Rendiconti tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
