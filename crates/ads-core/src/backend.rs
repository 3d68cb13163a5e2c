//! Contract between the client core and the persistence backend.
//!
//! The backend owns authentication, persistence and business rules. Every
//! authenticated call receives an explicit [`RequestContext`] instead of
//! reading a token from shared state.

use ads_domain::{
    Address, Administrator, Beneficiary, Category, CategoryKind, EconomicAccount, EntityId,
    GeneralData, Patrimony, Report, ReportState, SignatureApplication, SigningBlock,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Per-request authentication data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    token: String,
}

impl RequestContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    #[serde(alias = "utente")]
    pub user: Administrator,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn single(items: Vec<T>) -> Self {
        Self {
            total: items.len() as u64,
            items,
            page: 1,
            pages: 1,
        }
    }

    pub fn empty() -> Self {
        Self::single(Vec::new())
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFilter {
    #[default]
    Active,
    Inactive,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeneficiaryQuery {
    pub search: Option<String>,
    pub active: ActiveFilter,
    pub page: u32,
    pub limit: u32,
}

impl Default for BeneficiaryQuery {
    fn default() -> Self {
        Self {
            search: None,
            active: ActiveFilter::Active,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BeneficiaryQuery {
    /// Query-string pairs in the backend's naming.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        match self.active {
            ActiveFilter::Active => pairs.push(("attivo", "true".into())),
            ActiveFilter::Inactive => pairs.push(("attivo", "false".into())),
            ActiveFilter::All => {}
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub state: Option<ReportState>,
    pub year: Option<i32>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            state: None,
            year: None,
            search: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReportQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.max(1).to_string()),
            ("limit", self.limit.max(1).to_string()),
        ];
        if let Some(state) = self.state {
            pairs.push(("stato", state.as_query_value().to_string()));
        }
        if let Some(year) = self.year {
            pairs.push(("anno", year.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

/// Body for beneficiary create/update.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BeneficiaryInput {
    #[serde(rename = "nome")]
    pub first_name: String,
    #[serde(rename = "cognome")]
    pub last_name: String,
    #[serde(rename = "codiceFiscale")]
    pub fiscal_code: String,
    #[serde(rename = "dataNascita", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "luogoNascita", skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(rename = "indirizzo", skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "note", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "condizioniPersonali", skip_serializing_if = "Option::is_none")]
    pub personal_conditions: Option<String>,
    #[serde(rename = "patrimonio")]
    pub patrimony: Patrimony,
}

/// What the backend did on delete: reports referencing the beneficiary force
/// a soft delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteOutcome {
    #[serde(alias = "disattivato")]
    Deactivated,
    #[serde(alias = "eliminato")]
    Removed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: CategoryKind,
    #[serde(rename = "descrizione", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "colore")]
    pub color: String,
}

/// How the editor asked to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveKind {
    #[serde(rename = "bozza")]
    Draft,
    #[serde(rename = "definitivo")]
    Final,
    #[serde(rename = "pdf")]
    PdfExport,
}

impl SaveKind {
    /// Lifecycle state recorded for this kind of save.
    pub fn target_state(self) -> ReportState {
        match self {
            SaveKind::Draft => ReportState::Draft,
            SaveKind::Final | SaveKind::PdfExport => ReportState::Completed,
        }
    }
}

/// Full report body sent on create/update.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportPayload {
    #[serde(rename = "beneficiario")]
    pub beneficiary_id: EntityId,
    #[serde(rename = "datiGenerali")]
    pub general: GeneralData,
    #[serde(rename = "contoEconomico")]
    pub account: EconomicAccount,
    #[serde(rename = "firma")]
    pub signing: SigningBlock,
    #[serde(rename = "stato")]
    pub state: ReportState,
    #[serde(rename = "tipoSalvataggio")]
    pub save_kind: SaveKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Completeness {
    #[serde(rename = "completo", alias = "complete", default)]
    pub complete: bool,
    #[serde(rename = "mancanti", alias = "missing", default)]
    pub missing: Vec<String>,
}

/// Editable profile fields. The email is immutable and never sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "cognome", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "codiceFiscale", skip_serializing_if = "Option::is_none")]
    pub fiscal_code: Option<String>,
    #[serde(rename = "qualifica", skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(rename = "tribunale", skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
}

/// Raw image file plus the MIME type detected client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Abstraction over the remote API. Implementations map transport failures
/// to [`crate::CoreError`] and must report HTTP 401 as `Unauthorized`.
pub trait Backend: Send + Sync {
    fn login(&self, credentials: &Credentials) -> CoreResult<AuthResponse>;

    fn current_user(&self, ctx: &RequestContext) -> CoreResult<Administrator>;
    fn update_profile(&self, ctx: &RequestContext, update: &ProfileUpdate)
        -> CoreResult<Administrator>;

    fn list_beneficiaries(
        &self,
        ctx: &RequestContext,
        query: &BeneficiaryQuery,
    ) -> CoreResult<Page<Beneficiary>>;
    fn get_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary>;
    fn create_beneficiary(
        &self,
        ctx: &RequestContext,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary>;
    fn update_beneficiary(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary>;
    fn delete_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<DeleteOutcome>;
    fn reactivate_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary>;
    fn beneficiary_reports(&self, ctx: &RequestContext, id: &str) -> CoreResult<Vec<Report>>;

    fn list_categories(
        &self,
        ctx: &RequestContext,
        kind: Option<CategoryKind>,
    ) -> CoreResult<Vec<Category>>;
    fn default_categories(&self, ctx: &RequestContext) -> CoreResult<Vec<Category>>;
    fn create_category(&self, ctx: &RequestContext, input: &CategoryInput) -> CoreResult<Category>;
    fn update_category(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &CategoryInput,
    ) -> CoreResult<Category>;
    fn delete_category(&self, ctx: &RequestContext, id: &str) -> CoreResult<()>;

    fn list_reports(&self, ctx: &RequestContext, query: &ReportQuery) -> CoreResult<Page<Report>>;
    fn get_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<Report>;
    fn create_report(&self, ctx: &RequestContext, payload: &ReportPayload) -> CoreResult<Report>;
    fn update_report(
        &self,
        ctx: &RequestContext,
        id: &str,
        payload: &ReportPayload,
    ) -> CoreResult<Report>;
    fn set_report_state(
        &self,
        ctx: &RequestContext,
        id: &str,
        state: ReportState,
    ) -> CoreResult<Report>;
    fn delete_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<()>;
    fn report_completeness(&self, ctx: &RequestContext, id: &str) -> CoreResult<Completeness>;

    fn upload_signature(
        &self,
        ctx: &RequestContext,
        image: &ImageData,
        password: &str,
    ) -> CoreResult<Administrator>;
    fn delete_signature(&self, ctx: &RequestContext, password: &str) -> CoreResult<Administrator>;
    fn apply_signature(
        &self,
        ctx: &RequestContext,
        report_id: &str,
        password: &str,
    ) -> CoreResult<SignatureApplication>;
    /// Raw bytes of the administrator's uploaded signature image.
    fn signature_image(&self, ctx: &RequestContext) -> CoreResult<Option<ImageData>>;
    /// Downloads an image the server recorded by reference, such as the one
    /// attached to a signed report. `None` when the server no longer has it.
    fn stored_image(&self, ctx: &RequestContext, reference: &str) -> CoreResult<Option<ImageData>>;
}
