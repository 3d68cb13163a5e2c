//! ads-core
//!
//! Client-side logic for guardianship reports: aggregation, totals,
//! validation, the report editor, stores and the backend contract.
//! Depends on ads-domain. No HTTP, no rendering, no filesystem access.

pub mod aggregation;
pub mod backend;
pub mod beneficiary_form;
pub mod document;
pub mod editor;
pub mod error;
pub mod format;
pub mod navigation;
pub mod notifications;
pub mod session;
pub mod signature;
pub mod stores;
pub mod time;
pub mod totals;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregation::*;
pub use backend::*;
pub use beneficiary_form::*;
pub use document::*;
pub use editor::*;
pub use error::{CoreError, CoreResult, ErrorClass};
pub use format::*;
pub use navigation::Route;
pub use notifications::*;
pub use session::*;
pub use stores::*;
pub use time::*;
pub use totals::*;
pub use validation::*;

#[cfg(test)]
mod tests;
