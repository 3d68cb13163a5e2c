//! ads-domain
//!
//! Pure domain models (Beneficiary, Patrimony, Category, Report, Administrator).
//! No I/O, no HTTP, no rendering. Only data types, wire mappings and core enums.

pub mod administrator;
pub mod beneficiary;
pub mod category;
pub mod common;
pub mod patrimony;
pub mod report;

pub use administrator::*;
pub use beneficiary::*;
pub use category::*;
pub use common::*;
pub use patrimony::*;
pub use report::*;
