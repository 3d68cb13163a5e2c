use std::sync::Arc;

use ads_domain::{Report, ReportState, SignatureApplication};
use tracing::{debug, info};

use crate::backend::{Completeness, Page, ReportQuery};
use crate::session::ApiClient;
use crate::signature::check_application;
use crate::{CoreError, CoreResult};

pub struct ReportStore {
    api: Arc<ApiClient>,
    query: ReportQuery,
    page: Page<Report>,
    loaded_for: Option<ReportQuery>,
}

impl ReportStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            query: ReportQuery::default(),
            page: Page::empty(),
            loaded_for: None,
        }
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: ReportQuery) {
        self.query = query;
    }

    pub fn set_state_filter(&mut self, state: Option<ReportState>) {
        self.query.state = state;
        self.query.page = 1;
    }

    pub fn set_year_filter(&mut self, year: Option<i32>) {
        self.query.year = year;
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.max(1);
    }

    pub fn page(&self) -> &Page<Report> {
        &self.page
    }

    pub fn invalidate(&mut self) {
        self.loaded_for = None;
    }

    pub fn fetch(&mut self) -> CoreResult<&Page<Report>> {
        let query = self.query.clone();
        let page = self.api.call(|backend, ctx| backend.list_reports(ctx, &query))?;
        debug!(count = page.items.len(), total = page.total, "reports fetched");
        self.page = page;
        self.loaded_for = Some(query);
        Ok(&self.page)
    }

    pub fn ensure_loaded(&mut self) -> CoreResult<&Page<Report>> {
        if self.loaded_for.as_ref() == Some(&self.query) {
            return Ok(&self.page);
        }
        self.fetch()
    }

    /// Loads one report and refreshes its cached copy.
    pub fn get(&mut self, id: &str) -> CoreResult<Report> {
        let report = self.api.call(|backend, ctx| backend.get_report(ctx, id))?;
        self.replace_cached(&report);
        Ok(report)
    }

    pub fn delete(&mut self, id: &str) -> CoreResult<()> {
        self.api.call(|backend, ctx| backend.delete_report(ctx, id))?;
        info!(report = %id, "report deleted");
        let before = self.page.items.len();
        self.page.items.retain(|report| report.id != id);
        if self.page.items.len() < before {
            self.page.total = self.page.total.saturating_sub(1);
        }
        Ok(())
    }

    /// Moves a report along its lifecycle. Sent reports never change again.
    pub fn set_state(&mut self, id: &str, state: ReportState) -> CoreResult<Report> {
        let current = self.cached_or_fetch(id)?;
        if current.state.is_terminal() {
            return Err(CoreError::ReportLocked(current.id));
        }
        if !current.state.can_transition_to(state) {
            return Err(CoreError::InvalidOperation(format!(
                "il rendiconto è già nello stato {state}"
            )));
        }
        let report = self
            .api
            .call(|backend, ctx| backend.set_report_state(ctx, id, state))?;
        info!(report = %id, state = %report.state, "report state changed");
        self.replace_cached(&report);
        Ok(report)
    }

    pub fn completeness(&self, id: &str) -> CoreResult<Completeness> {
        self.api
            .call(|backend, ctx| backend.report_completeness(ctx, id))
    }

    /// Attaches the administrator's signature after password confirmation.
    pub fn apply_signature(&mut self, id: &str, password: &str) -> CoreResult<SignatureApplication> {
        let user = self.api.current_user().ok_or(CoreError::Unauthorized)?;
        let report = self.cached_or_fetch(id)?;
        check_application(&user, &report, password)?;
        let application = self
            .api
            .call(|backend, ctx| backend.apply_signature(ctx, id, password))?;
        info!(report = %id, "signature applied");
        if let Some(cached) = self.page.items.iter_mut().find(|r| r.id == id) {
            cached.signing.signature = Some(application.clone());
        }
        Ok(application)
    }

    fn cached_or_fetch(&mut self, id: &str) -> CoreResult<Report> {
        match self.page.items.iter().find(|report| report.id == id) {
            Some(report) => Ok(report.clone()),
            None => self.get(id),
        }
    }

    fn replace_cached(&mut self, report: &Report) {
        if let Some(slot) = self.page.items.iter_mut().find(|r| r.id == report.id) {
            *slot = report.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_client, FakeBackend, TEST_PASSWORD};
    use ads_domain::{BeneficiaryRef, GeneralData};
    use chrono::NaiveDate;

    fn seed(backend: &FakeBackend, id: &str, state: ReportState) {
        backend.insert_report(Report {
            id: id.into(),
            beneficiary: BeneficiaryRef::Id("b1".into()),
            general: GeneralData {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
                registry_number: "RG 1/2024".into(),
            },
            account: Default::default(),
            signing: Default::default(),
            state,
            created_at: None,
            updated_at: None,
        });
    }

    #[test]
    fn state_changes_update_cache_and_stop_at_sent() {
        let (backend, api) = signed_in_client();
        seed(&backend, "r1", ReportState::Draft);
        let mut store = ReportStore::new(Arc::new(api));
        store.ensure_loaded().unwrap();

        let report = store.set_state("r1", ReportState::Sent).unwrap();
        assert_eq!(report.state, ReportState::Sent);
        assert_eq!(store.page().items[0].state, ReportState::Sent);

        assert!(matches!(
            store.set_state("r1", ReportState::Draft),
            Err(CoreError::ReportLocked(_))
        ));
        assert_eq!(backend.call_count("set_report_state"), 1);
    }

    #[test]
    fn filters_by_year_and_state() {
        let (backend, api) = signed_in_client();
        seed(&backend, "r1", ReportState::Draft);
        seed(&backend, "r2", ReportState::Completed);
        let mut store = ReportStore::new(Arc::new(api));
        store.set_state_filter(Some(ReportState::Completed));
        store.set_year_filter(Some(2024));
        let page = store.ensure_loaded().unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "r2");
    }

    #[test]
    fn delete_drops_cached_entry() {
        let (backend, api) = signed_in_client();
        seed(&backend, "r1", ReportState::Draft);
        let mut store = ReportStore::new(Arc::new(api));
        store.fetch().unwrap();
        store.delete("r1").unwrap();
        assert!(store.page().items.is_empty());
        assert_eq!(store.page().total, 0);
        assert!(matches!(store.get("r1"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn signature_needs_uploaded_image() {
        let (backend, api) = signed_in_client();
        seed(&backend, "r1", ReportState::Draft);
        let api = Arc::new(api);
        let mut store = ReportStore::new(api.clone());
        assert!(store.apply_signature("r1", TEST_PASSWORD).is_err());
        assert_eq!(backend.call_count("apply_signature"), 0);

        let image = crate::signature::prepare_upload(
            "firma.jpg",
            vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0],
            TEST_PASSWORD,
        )
        .unwrap();
        let user = api
            .call(|backend, ctx| backend.upload_signature(ctx, &image, TEST_PASSWORD))
            .unwrap();
        api.update_cached_user(user).unwrap();

        let application = store.apply_signature("r1", TEST_PASSWORD).unwrap();
        assert_eq!(application.administrator_full_name, "Laura Verdi");
        assert!(matches!(
            store.apply_signature("r1", "sbagliata"),
            Err(CoreError::Api { status: 403, .. })
        ));
        assert!(api.is_authenticated());
    }

    #[test]
    fn completeness_lists_missing_parts() {
        let (backend, api) = signed_in_client();
        seed(&backend, "r1", ReportState::Draft);
        let store = ReportStore::new(Arc::new(api));
        let completeness = store.completeness("r1").unwrap();
        assert!(!completeness.complete);
        assert!(completeness.missing.contains(&"Firma".to_string()));
    }
}
