//! Application facade.
//!
//! [`Application`] owns the API client, the stores and the notification
//! centre. Every user action goes through [`Application::run`], which turns
//! failures into notifications and a safe destination.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use ads_config::{ClientConfig, ConfigManager};
use ads_core::{
    ApiClient, Backend, BeneficiaryStore, CategoryStore, Clock, CoreResult, DeleteOutcome,
    DocumentRenderer, ErrorClass, NotificationCenter, ProfileStore, ReportEditor, ReportStore,
    Route, SaveKind, SaveOutcome, SessionStorage, SystemClock,
};
use ads_domain::{Administrator, Beneficiary, Report, ReportState, SignatureApplication};
use ads_http::{HttpBackend, HttpClientConfig};
use ads_pdf::PdfRenderer;
use tracing::{debug, info, warn};

use crate::export::{self, ExportedPdf};
use crate::utils::FileSessionStorage;
use crate::{AppError, AppResult};

const SESSION_EXPIRED: &str = "Sessione scaduta, effettua nuovamente l'accesso";

pub struct Application {
    config: ClientConfig,
    api: Arc<ApiClient>,
    renderer: Box<dyn DocumentRenderer>,
    clock: Box<dyn Clock>,
    session_expired: Arc<AtomicBool>,
    pub beneficiaries: BeneficiaryStore,
    pub reports: ReportStore,
    pub categories: CategoryStore,
    pub profile: ProfileStore,
    notifications: NotificationCenter,
    route: Route,
}

impl Application {
    /// Production wiring: HTTP backend, session file under the data
    /// directory, printpdf renderer and the system clock.
    pub fn connect(config: ClientConfig) -> AppResult<Self> {
        config.validate()?;
        let http = HttpClientConfig::default().with_request_timeout(config.timeout());
        let backend = HttpBackend::new(config.base_url(), &http)?;
        let manager = ConfigManager::with_base_dir(config.resolve_data_dir())?;
        let storage = FileSessionStorage::new(manager.session_file());
        info!(api = config.base_url(), "connecting to backend");
        Ok(Self::with_parts(
            config,
            Arc::new(backend),
            Box::new(storage),
            Box::new(PdfRenderer::new()),
            Box::new(SystemClock),
        ))
    }

    pub fn with_parts(
        config: ClientConfig,
        backend: Arc<dyn Backend>,
        storage: Box<dyn SessionStorage>,
        renderer: Box<dyn DocumentRenderer>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let session_expired = Arc::new(AtomicBool::new(false));
        let flag = session_expired.clone();
        let api = Arc::new(
            ApiClient::new(backend, storage).with_unauthorized_handler(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
            })),
        );
        Self {
            config,
            beneficiaries: BeneficiaryStore::new(api.clone()),
            reports: ReportStore::new(api.clone()),
            categories: CategoryStore::new(api.clone()),
            profile: ProfileStore::new(api.clone()),
            api,
            renderer,
            clock,
            session_expired,
            notifications: NotificationCenter::new(),
            route: Route::Login,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn current_user(&self) -> Option<Administrator> {
        self.api.current_user()
    }

    /// Restores a stored session and picks the landing route.
    pub fn start(&mut self) -> &Route {
        match self.api.restore() {
            Ok(true) => self.route = Route::Dashboard,
            Ok(false) => self.route = Route::Login,
            Err(err) => {
                warn!(error = %err, "stored session unreadable");
                self.route = Route::Login;
            }
        }
        &self.route
    }

    /// Moves to `route`, or to the login when it needs a session we lack.
    pub fn navigate(&mut self, route: Route) -> &Route {
        self.route = if route.requires_auth() && !self.api.is_authenticated() {
            Route::Login
        } else {
            route
        };
        debug!(route = %self.route, "navigated");
        &self.route
    }

    /// Runs an action and converts its failure into a notification plus a
    /// fallback destination:
    ///
    /// - validation errors stay inline, nothing is notified;
    /// - an expired session logs out and goes to the login;
    /// - a missing record goes to `fallback` with an error notification;
    /// - anything else is notified and the current state is kept.
    pub fn run<T, E>(
        &mut self,
        fallback: Route,
        action: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Option<T>
    where
        E: Into<AppError>,
    {
        let outcome = action(self).map_err(Into::into);
        let expired = self.session_expired.swap(false, Ordering::SeqCst);
        match outcome {
            Ok(value) if !expired => Some(value),
            Ok(_) => {
                self.end_session();
                None
            }
            Err(err) => {
                match err.class() {
                    ErrorClass::Validation => debug!(error = %err, "validation failed"),
                    ErrorClass::Auth => self.end_session(),
                    ErrorClass::NotFound => {
                        warn!(error = %err, fallback = %fallback, "record not found");
                        self.notifications.error(err.to_string());
                        self.route = fallback;
                    }
                    ErrorClass::Backend => {
                        warn!(error = %err, "action failed");
                        self.notifications.error(err.to_string());
                    }
                }
                if expired && !matches!(self.route, Route::Login) {
                    self.end_session();
                }
                None
            }
        }
    }

    fn end_session(&mut self) {
        self.api.logout();
        self.beneficiaries.invalidate();
        self.reports.invalidate();
        self.notifications.warning(SESSION_EXPIRED);
        self.route = Route::Login;
    }

    pub fn login(&mut self, email: &str, password: &str) -> Option<Administrator> {
        let user = self.run(Route::Login, |app| app.api.login(email, password))?;
        self.notifications
            .success(format!("Benvenuto, {}", user.full_name()));
        self.route = Route::Dashboard;
        Some(user)
    }

    pub fn logout(&mut self) {
        self.api.logout();
        self.beneficiaries.invalidate();
        self.reports.invalidate();
        self.route = Route::Login;
    }

    pub fn open_beneficiary(&mut self, id: &str) -> Option<Beneficiary> {
        let beneficiary = self.run(Route::Beneficiaries, |app| app.beneficiaries.get(id))?;
        self.route = Route::BeneficiaryDetail(beneficiary.id.clone());
        Some(beneficiary)
    }

    pub fn delete_beneficiary(&mut self, id: &str) -> Option<DeleteOutcome> {
        let outcome = self.run(Route::Beneficiaries, |app| app.beneficiaries.delete(id))?;
        let message = match outcome {
            DeleteOutcome::Deactivated => {
                "Beneficiario disattivato: ha rendiconti associati"
            }
            DeleteOutcome::Removed => "Beneficiario eliminato",
        };
        self.notifications.success(message);
        self.route = Route::Beneficiaries;
        Some(outcome)
    }

    pub fn reactivate_beneficiary(&mut self, id: &str) -> Option<Beneficiary> {
        let beneficiary =
            self.run(Route::Beneficiaries, |app| app.beneficiaries.reactivate(id))?;
        self.notifications.success("Beneficiario riattivato");
        Some(beneficiary)
    }

    pub fn open_report(&mut self, id: &str) -> Option<Report> {
        let report = self.run(Route::Reports, |app| app.reports.get(id))?;
        self.route = Route::ReportDetail(report.id.clone());
        Some(report)
    }

    /// Opens the editor on an existing report, with its beneficiary attached.
    pub fn edit_report(&mut self, id: &str) -> Option<ReportEditor> {
        let editor = self.run(Route::Reports, |app| -> CoreResult<ReportEditor> {
            let report = app.reports.get(id)?;
            let beneficiary = app.beneficiaries.get(report.beneficiary_id())?;
            ReportEditor::edit(&report, Some(beneficiary))
        })?;
        self.route = Route::ReportEditor(Some(id.to_string()));
        Some(editor)
    }

    /// Saves the editor's draft. On success the report list is refreshed on
    /// next access and the editor's follow-up route becomes current.
    pub fn save_report(&mut self, editor: &mut ReportEditor, kind: SaveKind) -> Option<SaveOutcome> {
        let outcome = self.run(Route::Reports, |app| editor.save(kind, &app.api))?;
        self.reports.invalidate();
        let message = match kind {
            SaveKind::Draft => "Bozza salvata",
            SaveKind::Final => "Rendiconto salvato",
            SaveKind::PdfExport => "Rendiconto salvato, pronto per l'esportazione PDF",
        };
        self.notifications.success(message);
        self.route = outcome.follow_up.clone();
        Some(outcome)
    }

    pub fn delete_report(&mut self, id: &str) -> Option<()> {
        self.run(Route::Reports, |app| app.reports.delete(id))?;
        self.notifications.success("Rendiconto eliminato");
        self.route = Route::Reports;
        Some(())
    }

    pub fn set_report_state(&mut self, id: &str, state: ReportState) -> Option<Report> {
        let report = self.run(Route::Reports, |app| app.reports.set_state(id, state))?;
        self.notifications
            .success(format!("Stato aggiornato: {}", report.state));
        Some(report)
    }

    pub fn apply_signature(&mut self, id: &str, password: &str) -> Option<SignatureApplication> {
        let applied = self.run(Route::Reports, |app| app.reports.apply_signature(id, password))?;
        self.notifications.success("Firma applicata al rendiconto");
        Some(applied)
    }

    /// Renders the report to PDF and writes it to the export directory.
    pub fn export_report_pdf(&mut self, id: &str) -> Option<ExportedPdf> {
        let dir = self.config.resolve_export_dir();
        let exported = self.run(Route::Reports, |app| {
            export::export_report_pdf(&app.api, app.renderer.as_ref(), app.clock.as_ref(), id, &dir)
        })?;
        self.notifications
            .success(format!("PDF esportato: {}", exported.file_name));
        Some(exported)
    }
}
