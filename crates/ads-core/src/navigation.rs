//! Destinations the application can move to after an action.

use std::fmt;

use ads_domain::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Beneficiaries,
    BeneficiaryDetail(EntityId),
    Reports,
    ReportDetail(EntityId),
    ReportEditor(Option<EntityId>),
    Categories,
    Profile,
}

impl Route {
    /// Whether the destination needs an authenticated session.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::Dashboard => f.write_str("/"),
            Route::Beneficiaries => f.write_str("/beneficiari"),
            Route::BeneficiaryDetail(id) => write!(f, "/beneficiari/{id}"),
            Route::Reports => f.write_str("/rendiconti"),
            Route::ReportDetail(id) => write!(f, "/rendiconti/{id}"),
            Route::ReportEditor(None) => f.write_str("/rendiconti/nuovo"),
            Route::ReportEditor(Some(id)) => write!(f, "/rendiconti/{id}/modifica"),
            Route::Categories => f.write_str("/categorie"),
            Route::Profile => f.write_str("/profilo"),
        }
    }
}
