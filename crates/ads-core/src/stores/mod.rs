//! Explicit state containers over the API client.
//!
//! Each store caches what the views last asked for and refreshes it after
//! mutations. Nothing here is global: the application owns one of each.

mod beneficiary_store;
mod category_store;
mod profile_store;
mod report_store;

pub use beneficiary_store::BeneficiaryStore;
pub use category_store::CategoryStore;
pub use profile_store::ProfileStore;
pub use report_store::ReportStore;
