//! In-memory [`Backend`] used by unit and integration tests.
//!
//! It mimics the server rules the client relies on: token checks, soft
//! delete of referenced beneficiaries, immutable default categories,
//! "in use" category protection, sent-report locking and password
//! confirmation for signature operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use ads_domain::{
    Administrator, Beneficiary, BeneficiaryRef, Category, CategoryKind, Report, ReportState,
    SignatureApplication, SignatureImage,
};
use chrono::{TimeZone, Utc};

use crate::backend::*;
use crate::session::{ApiClient, MemorySessionStorage};
use crate::{CoreError, CoreResult};

pub const TEST_EMAIL: &str = "laura.verdi@example.it";
pub const TEST_PASSWORD: &str = "segreta";

#[derive(Default)]
struct FakeState {
    user: Option<Administrator>,
    password: String,
    tokens: HashSet<String>,
    beneficiaries: Vec<Beneficiary>,
    categories: Vec<Category>,
    reports: Vec<Report>,
    signature: Option<ImageData>,
    stored_images: HashMap<String, ImageData>,
    failures: Vec<CoreError>,
    calls: Vec<String>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    /// Backend with one administrator and the default categories.
    pub fn new() -> Self {
        let mut state = FakeState {
            user: Some(test_administrator()),
            password: TEST_PASSWORD.to_string(),
            ..FakeState::default()
        };
        for (name, kind) in [
            ("Pensione", CategoryKind::Income),
            ("Rendite", CategoryKind::Income),
            ("Farmaci", CategoryKind::Expense),
            ("Affitto", CategoryKind::Expense),
        ] {
            let id = state.next_id("cat-");
            let mut category = Category::new(id, name, kind);
            category.is_default = true;
            state.categories.push(category);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The next backend call fails with `error` (after the token check).
    pub fn fail_next(&self, error: CoreError) {
        self.state().failures.insert(0, error);
    }

    /// Invalidates every issued token, as if the server session expired.
    pub fn expire_tokens(&self) {
        self.state().tokens.clear();
    }

    pub fn insert_beneficiary(&self, beneficiary: Beneficiary) {
        self.state().beneficiaries.push(beneficiary);
    }

    pub fn insert_report(&self, report: Report) {
        self.state().reports.push(report);
    }

    /// Drops every uploaded image file, as if the server lost them.
    pub fn forget_stored_images(&self) {
        self.state().stored_images.clear();
    }

    pub fn reports(&self) -> Vec<Report> {
        self.state().reports.clone()
    }

    pub fn beneficiaries(&self) -> Vec<Beneficiary> {
        self.state().beneficiaries.clone()
    }

    /// Names of the operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    fn authorize(&self, ctx: &RequestContext, operation: &str) -> CoreResult<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(operation.to_string());
        if !state.tokens.contains(ctx.token()) {
            return Err(CoreError::Unauthorized);
        }
        if !state.failures.is_empty() {
            return Err(state.failures.remove(0));
        }
        Ok(state)
    }
}

/// Fake backend plus an [`ApiClient`] already signed in against it.
pub fn signed_in_client() -> (Arc<FakeBackend>, ApiClient) {
    let backend = Arc::new(FakeBackend::new());
    let api = ApiClient::new(backend.clone(), Box::new(MemorySessionStorage::new()));
    if let Err(err) = api.login(TEST_EMAIL, TEST_PASSWORD) {
        panic!("fake login failed: {err}");
    }
    (backend, api)
}

pub fn test_administrator() -> Administrator {
    Administrator {
        id: "admin-1".into(),
        first_name: "Laura".into(),
        last_name: "Verdi".into(),
        email: TEST_EMAIL.into(),
        phone: None,
        fiscal_code: None,
        qualification: Some("Avvocato".into()),
        court: Some("Tribunale di Milano".into()),
        signature: None,
    }
}

fn check_password(state: &FakeState, password: &str) -> CoreResult<()> {
    if password == state.password {
        Ok(())
    } else {
        Err(CoreError::api(403, "Password non corretta"))
    }
}

fn report_mut<'a>(state: &'a mut FakeState, id: &str) -> CoreResult<&'a mut Report> {
    state
        .reports
        .iter_mut()
        .find(|report| report.id == id)
        .ok_or_else(|| CoreError::NotFound("Rendiconto".into()))
}

fn paginate<T: Clone>(items: Vec<T>, page: u32, limit: u32) -> Page<T> {
    let limit = limit.max(1) as usize;
    let page = page.max(1);
    let total = items.len();
    let pages = total.div_ceil(limit).max(1) as u32;
    let start = (page as usize - 1) * limit;
    Page {
        items: items.into_iter().skip(start).take(limit).collect(),
        total: total as u64,
        page,
        pages,
    }
}

fn matches_search(haystacks: &[&str], needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|needle| !needle.is_empty()) {
        Some(needle) => {
            let needle = needle.to_lowercase();
            haystacks
                .iter()
                .any(|hay| hay.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

impl Backend for FakeBackend {
    fn login(&self, credentials: &Credentials) -> CoreResult<AuthResponse> {
        let mut state = self.state();
        state.calls.push("login".into());
        let user = state.user.clone().ok_or(CoreError::Unauthorized)?;
        if credentials.email != user.email || credentials.password != state.password {
            return Err(CoreError::api(400, "Credenziali non valide"));
        }
        let token = state.next_id("token-");
        state.tokens.insert(token.clone());
        Ok(AuthResponse { token, user })
    }

    fn current_user(&self, ctx: &RequestContext) -> CoreResult<Administrator> {
        let state = self.authorize(ctx, "current_user")?;
        state.user.clone().ok_or(CoreError::Unauthorized)
    }

    fn update_profile(
        &self,
        ctx: &RequestContext,
        update: &ProfileUpdate,
    ) -> CoreResult<Administrator> {
        let mut state = self.authorize(ctx, "update_profile")?;
        let user = state.user.as_mut().ok_or(CoreError::Unauthorized)?;
        if let Some(value) = &update.first_name {
            user.first_name = value.clone();
        }
        if let Some(value) = &update.last_name {
            user.last_name = value.clone();
        }
        if let Some(value) = &update.phone {
            user.phone = Some(value.clone());
        }
        if let Some(value) = &update.fiscal_code {
            user.fiscal_code = Some(value.clone());
        }
        if let Some(value) = &update.qualification {
            user.qualification = Some(value.clone());
        }
        if let Some(value) = &update.court {
            user.court = Some(value.clone());
        }
        Ok(user.clone())
    }

    fn list_beneficiaries(
        &self,
        ctx: &RequestContext,
        query: &BeneficiaryQuery,
    ) -> CoreResult<Page<Beneficiary>> {
        let state = self.authorize(ctx, "list_beneficiaries")?;
        let items: Vec<Beneficiary> = state
            .beneficiaries
            .iter()
            .filter(|b| match query.active {
                ActiveFilter::Active => b.active,
                ActiveFilter::Inactive => !b.active,
                ActiveFilter::All => true,
            })
            .filter(|b| {
                matches_search(
                    &[
                        b.first_name.as_str(),
                        b.last_name.as_str(),
                        b.fiscal_code.as_str(),
                    ],
                    query.search.as_deref(),
                )
            })
            .cloned()
            .collect();
        Ok(paginate(items, query.page, query.limit))
    }

    fn get_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary> {
        let state = self.authorize(ctx, "get_beneficiary")?;
        state
            .beneficiaries
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("Beneficiario".into()))
    }

    fn create_beneficiary(
        &self,
        ctx: &RequestContext,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary> {
        let mut state = self.authorize(ctx, "create_beneficiary")?;
        if state
            .beneficiaries
            .iter()
            .any(|b| b.fiscal_code == input.fiscal_code)
        {
            return Err(CoreError::api(400, "Codice fiscale già registrato"));
        }
        let id = state.next_id("ben-");
        let beneficiary = beneficiary_from_input(id, input, true);
        state.beneficiaries.push(beneficiary.clone());
        Ok(beneficiary)
    }

    fn update_beneficiary(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &BeneficiaryInput,
    ) -> CoreResult<Beneficiary> {
        let mut state = self.authorize(ctx, "update_beneficiary")?;
        let existing = state
            .beneficiaries
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| CoreError::NotFound("Beneficiario".into()))?;
        *existing = beneficiary_from_input(id.to_string(), input, existing.active);
        Ok(existing.clone())
    }

    fn delete_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<DeleteOutcome> {
        let mut state = self.authorize(ctx, "delete_beneficiary")?;
        let referenced = state.reports.iter().any(|r| r.beneficiary_id() == id);
        let position = state
            .beneficiaries
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| CoreError::NotFound("Beneficiario".into()))?;
        if referenced {
            state.beneficiaries[position].active = false;
            Ok(DeleteOutcome::Deactivated)
        } else {
            state.beneficiaries.remove(position);
            Ok(DeleteOutcome::Removed)
        }
    }

    fn reactivate_beneficiary(&self, ctx: &RequestContext, id: &str) -> CoreResult<Beneficiary> {
        let mut state = self.authorize(ctx, "reactivate_beneficiary")?;
        let beneficiary = state
            .beneficiaries
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| CoreError::NotFound("Beneficiario".into()))?;
        beneficiary.active = true;
        Ok(beneficiary.clone())
    }

    fn beneficiary_reports(&self, ctx: &RequestContext, id: &str) -> CoreResult<Vec<Report>> {
        let state = self.authorize(ctx, "beneficiary_reports")?;
        Ok(state
            .reports
            .iter()
            .filter(|r| r.beneficiary_id() == id)
            .cloned()
            .collect())
    }

    fn list_categories(
        &self,
        ctx: &RequestContext,
        kind: Option<CategoryKind>,
    ) -> CoreResult<Vec<Category>> {
        let state = self.authorize(ctx, "list_categories")?;
        Ok(state
            .categories
            .iter()
            .filter(|c| kind.map_or(true, |kind| c.kind == kind))
            .cloned()
            .collect())
    }

    fn default_categories(&self, ctx: &RequestContext) -> CoreResult<Vec<Category>> {
        let state = self.authorize(ctx, "default_categories")?;
        Ok(state
            .categories
            .iter()
            .filter(|c| c.is_default)
            .cloned()
            .collect())
    }

    fn create_category(&self, ctx: &RequestContext, input: &CategoryInput) -> CoreResult<Category> {
        let mut state = self.authorize(ctx, "create_category")?;
        if state
            .categories
            .iter()
            .any(|c| c.kind == input.kind && c.name.eq_ignore_ascii_case(&input.name))
        {
            return Err(CoreError::api(400, "Categoria già esistente"));
        }
        let id = state.next_id("cat-");
        let category = Category {
            id,
            name: input.name.clone(),
            kind: input.kind,
            description: input.description.clone(),
            color: input.color.clone(),
            is_default: false,
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    fn update_category(
        &self,
        ctx: &RequestContext,
        id: &str,
        input: &CategoryInput,
    ) -> CoreResult<Category> {
        let mut state = self.authorize(ctx, "update_category")?;
        let category = state
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::NotFound("Categoria".into()))?;
        if category.is_default {
            return Err(CoreError::api(403, "Le categorie predefinite non sono modificabili"));
        }
        category.name = input.name.clone();
        category.kind = input.kind;
        category.description = input.description.clone();
        category.color = input.color.clone();
        Ok(category.clone())
    }

    fn delete_category(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        let mut state = self.authorize(ctx, "delete_category")?;
        let position = state
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::NotFound("Categoria".into()))?;
        let category = &state.categories[position];
        if category.is_default {
            return Err(CoreError::api(403, "Le categorie predefinite non sono eliminabili"));
        }
        let in_use = state.reports.iter().any(|report| {
            report
                .account
                .income
                .iter()
                .chain(report.account.expenses.iter())
                .any(|item| item.category == category.name)
        });
        if in_use {
            return Err(CoreError::api(409, "Categoria in uso in uno o più rendiconti"));
        }
        state.categories.remove(position);
        Ok(())
    }

    fn list_reports(&self, ctx: &RequestContext, query: &ReportQuery) -> CoreResult<Page<Report>> {
        let state = self.authorize(ctx, "list_reports")?;
        let items: Vec<Report> = state
            .reports
            .iter()
            .filter(|r| query.state.map_or(true, |s| r.state == s))
            .filter(|r| query.year.map_or(true, |y| r.reference_year() == Some(y)))
            .filter(|r| {
                let name = r
                    .beneficiary
                    .summary()
                    .map(|s| s.full_name())
                    .unwrap_or_default();
                matches_search(
                    &[name.as_str(), r.general.registry_number.as_str()],
                    query.search.as_deref(),
                )
            })
            .cloned()
            .collect();
        Ok(paginate(items, query.page, query.limit))
    }

    fn get_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<Report> {
        let state = self.authorize(ctx, "get_report")?;
        state
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("Rendiconto".into()))
    }

    fn create_report(&self, ctx: &RequestContext, payload: &ReportPayload) -> CoreResult<Report> {
        let mut state = self.authorize(ctx, "create_report")?;
        let summary = state
            .beneficiaries
            .iter()
            .find(|b| b.id == payload.beneficiary_id)
            .map(|b| BeneficiaryRef::Populated(b.into()))
            .ok_or_else(|| CoreError::api(400, "Beneficiario non valido"))?;
        let id = state.next_id("rep-");
        let report = Report {
            id,
            beneficiary: summary,
            general: payload.general.clone(),
            account: payload.account.clone(),
            signing: payload.signing.clone(),
            state: payload.state,
            created_at: None,
            updated_at: None,
        };
        state.reports.push(report.clone());
        Ok(report)
    }

    fn update_report(
        &self,
        ctx: &RequestContext,
        id: &str,
        payload: &ReportPayload,
    ) -> CoreResult<Report> {
        let mut state = self.authorize(ctx, "update_report")?;
        let report = report_mut(&mut state, id)?;
        if report.state.is_terminal() {
            return Err(CoreError::api(403, "Rendiconto già inviato"));
        }
        report.general = payload.general.clone();
        report.account = payload.account.clone();
        let signature = report.signing.signature.clone();
        report.signing = payload.signing.clone();
        if report.signing.signature.is_none() {
            report.signing.signature = signature;
        }
        report.state = payload.state;
        Ok(report.clone())
    }

    fn set_report_state(
        &self,
        ctx: &RequestContext,
        id: &str,
        new_state: ReportState,
    ) -> CoreResult<Report> {
        let mut state = self.authorize(ctx, "set_report_state")?;
        let report = report_mut(&mut state, id)?;
        if report.state.is_terminal() {
            return Err(CoreError::api(403, "Rendiconto già inviato"));
        }
        report.state = new_state;
        Ok(report.clone())
    }

    fn delete_report(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        let mut state = self.authorize(ctx, "delete_report")?;
        let before = state.reports.len();
        state.reports.retain(|r| r.id != id);
        if state.reports.len() == before {
            return Err(CoreError::NotFound("Rendiconto".into()));
        }
        Ok(())
    }

    fn report_completeness(&self, ctx: &RequestContext, id: &str) -> CoreResult<Completeness> {
        let mut state = self.authorize(ctx, "report_completeness")?;
        let report = report_mut(&mut state, id)?;
        let mut missing = Vec::new();
        if report.general.start_date.is_none() || report.general.end_date.is_none() {
            missing.push("Periodo di riferimento".to_string());
        }
        if report.general.registry_number.trim().is_empty() {
            missing.push("Numero R.G.".to_string());
        }
        if !report.signing.declarations.all_confirmed() {
            missing.push("Dichiarazioni".to_string());
        }
        if report.signing.signature.is_none() {
            missing.push("Firma".to_string());
        }
        Ok(Completeness {
            complete: missing.is_empty(),
            missing,
        })
    }

    fn upload_signature(
        &self,
        ctx: &RequestContext,
        image: &ImageData,
        password: &str,
    ) -> CoreResult<Administrator> {
        let mut state = self.authorize(ctx, "upload_signature")?;
        check_password(&state, password)?;
        let url = format!("/uploads/firme/{}", image.file_name);
        state.signature = Some(image.clone());
        state.stored_images.insert(url.clone(), image.clone());
        let user = state.user.as_mut().ok_or(CoreError::Unauthorized)?;
        user.signature = Some(SignatureImage {
            url,
            mime_type: Some(image.mime_type.clone()),
            uploaded_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single(),
        });
        Ok(user.clone())
    }

    fn delete_signature(&self, ctx: &RequestContext, password: &str) -> CoreResult<Administrator> {
        let mut state = self.authorize(ctx, "delete_signature")?;
        check_password(&state, password)?;
        state.signature = None;
        let user = state.user.as_mut().ok_or(CoreError::Unauthorized)?;
        user.signature = None;
        Ok(user.clone())
    }

    fn apply_signature(
        &self,
        ctx: &RequestContext,
        report_id: &str,
        password: &str,
    ) -> CoreResult<SignatureApplication> {
        let mut state = self.authorize(ctx, "apply_signature")?;
        check_password(&state, password)?;
        let user = state.user.clone().ok_or(CoreError::Unauthorized)?;
        let image = user
            .signature
            .as_ref()
            .map(|signature| signature.url.clone())
            .ok_or_else(|| CoreError::api(400, "Nessuna firma caricata"))?;
        let application = SignatureApplication {
            image,
            applied_at: Utc
                .with_ymd_and_hms(2024, 1, 2, 10, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            administrator_full_name: user.full_name(),
        };
        let report = report_mut(&mut state, report_id)?;
        report.signing.signature = Some(application.clone());
        Ok(application)
    }

    fn signature_image(&self, ctx: &RequestContext) -> CoreResult<Option<ImageData>> {
        let state = self.authorize(ctx, "signature_image")?;
        Ok(state.signature.clone())
    }

    fn stored_image(&self, ctx: &RequestContext, reference: &str) -> CoreResult<Option<ImageData>> {
        let state = self.authorize(ctx, "stored_image")?;
        Ok(state.stored_images.get(reference).cloned())
    }
}

fn beneficiary_from_input(id: String, input: &BeneficiaryInput, active: bool) -> Beneficiary {
    let mut beneficiary = Beneficiary::new(id, input.first_name.clone(), input.last_name.clone());
    beneficiary.fiscal_code = input.fiscal_code.clone();
    beneficiary.birth_date = input.birth_date;
    beneficiary.birth_place = input.birth_place.clone();
    beneficiary.address = input.address.clone();
    beneficiary.notes = input.notes.clone();
    beneficiary.personal_conditions = input.personal_conditions.clone();
    beneficiary.patrimony = input.patrimony.clone();
    beneficiary.active = active;
    beneficiary
}
