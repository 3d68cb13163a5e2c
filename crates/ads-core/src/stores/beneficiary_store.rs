use std::sync::Arc;

use ads_domain::{Beneficiary, Report};
use tracing::{debug, info};

use crate::backend::{ActiveFilter, BeneficiaryInput, BeneficiaryQuery, DeleteOutcome, Page};
use crate::session::ApiClient;
use crate::CoreResult;

/// Upper bound used when listing beneficiaries for a picker.
const SELECTABLE_LIMIT: u32 = 500;

pub struct BeneficiaryStore {
    api: Arc<ApiClient>,
    query: BeneficiaryQuery,
    page: Page<Beneficiary>,
    loaded_for: Option<BeneficiaryQuery>,
}

impl BeneficiaryStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            query: BeneficiaryQuery::default(),
            page: Page::empty(),
            loaded_for: None,
        }
    }

    pub fn query(&self) -> &BeneficiaryQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: BeneficiaryQuery) {
        self.query = query;
    }

    /// New search text; resets to the first page.
    pub fn set_search(&mut self, search: Option<String>) {
        self.query.search = search;
        self.query.page = 1;
    }

    pub fn set_active_filter(&mut self, filter: ActiveFilter) {
        self.query.active = filter;
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.max(1);
    }

    /// Last fetched page.
    pub fn page(&self) -> &Page<Beneficiary> {
        &self.page
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_for.is_some()
    }

    pub fn invalidate(&mut self) {
        self.loaded_for = None;
    }

    pub fn fetch(&mut self) -> CoreResult<&Page<Beneficiary>> {
        let query = self.query.clone();
        let page = self
            .api
            .call(|backend, ctx| backend.list_beneficiaries(ctx, &query))?;
        debug!(count = page.items.len(), total = page.total, "beneficiaries fetched");
        self.page = page;
        self.loaded_for = Some(query);
        Ok(&self.page)
    }

    /// Fetches only when nothing is loaded or the query changed since.
    pub fn ensure_loaded(&mut self) -> CoreResult<&Page<Beneficiary>> {
        if self.loaded_for.as_ref() == Some(&self.query) {
            return Ok(&self.page);
        }
        self.fetch()
    }

    pub fn get(&self, id: &str) -> CoreResult<Beneficiary> {
        self.api.call(|backend, ctx| backend.get_beneficiary(ctx, id))
    }

    pub fn create(&mut self, input: &BeneficiaryInput) -> CoreResult<Beneficiary> {
        let created = self
            .api
            .call(|backend, ctx| backend.create_beneficiary(ctx, input))?;
        info!(beneficiary = %created.id, "beneficiary created");
        self.invalidate();
        Ok(created)
    }

    pub fn update(&mut self, id: &str, input: &BeneficiaryInput) -> CoreResult<Beneficiary> {
        let updated = self
            .api
            .call(|backend, ctx| backend.update_beneficiary(ctx, id, input))?;
        info!(beneficiary = %updated.id, "beneficiary updated");
        self.replace_cached(&updated);
        Ok(updated)
    }

    /// The backend soft-deletes beneficiaries that still have reports.
    pub fn delete(&mut self, id: &str) -> CoreResult<DeleteOutcome> {
        let outcome = self
            .api
            .call(|backend, ctx| backend.delete_beneficiary(ctx, id))?;
        info!(beneficiary = %id, ?outcome, "beneficiary deleted");
        self.invalidate();
        Ok(outcome)
    }

    pub fn reactivate(&mut self, id: &str) -> CoreResult<Beneficiary> {
        let beneficiary = self
            .api
            .call(|backend, ctx| backend.reactivate_beneficiary(ctx, id))?;
        info!(beneficiary = %id, "beneficiary reactivated");
        self.invalidate();
        Ok(beneficiary)
    }

    pub fn reports_of(&self, id: &str) -> CoreResult<Vec<Report>> {
        self.api
            .call(|backend, ctx| backend.beneficiary_reports(ctx, id))
    }

    /// Active beneficiaries a new report may be attached to.
    pub fn selectable(&self) -> CoreResult<Vec<Beneficiary>> {
        let query = BeneficiaryQuery {
            active: ActiveFilter::Active,
            limit: SELECTABLE_LIMIT,
            ..BeneficiaryQuery::default()
        };
        let page = self
            .api
            .call(|backend, ctx| backend.list_beneficiaries(ctx, &query))?;
        Ok(page
            .items
            .into_iter()
            .filter(Beneficiary::is_selectable)
            .collect())
    }

    fn replace_cached(&mut self, beneficiary: &Beneficiary) {
        if let Some(slot) = self
            .page
            .items
            .iter_mut()
            .find(|cached| cached.id == beneficiary.id)
        {
            *slot = beneficiary.clone();
        }
    }
}
