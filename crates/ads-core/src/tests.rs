use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ads_domain::{Beneficiary, Declaration, EntryKind, PatrimonyItem, ReportState};
use chrono::NaiveDate;

use crate::testing::{FakeBackend, TEST_EMAIL, TEST_PASSWORD};
use crate::{
    ApiClient, BeneficiaryStore, CoreError, EditorStep, MemorySessionStorage, ReportEditor,
    ReportStore, Route, SaveKind, SessionStorage,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn client_with_counter(backend: Arc<FakeBackend>) -> (Arc<ApiClient>, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let api = ApiClient::new(backend, Box::new(MemorySessionStorage::new()))
        .with_unauthorized_handler(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    (Arc::new(api), fired)
}

#[test]
fn report_lifecycle_from_editor_to_sent() {
    let backend = Arc::new(FakeBackend::new());
    let mut rossi = Beneficiary::new("ben-1", "Mario", "Rossi");
    rossi.fiscal_code = "RSSMRA80A01F205X".into();
    rossi
        .patrimony
        .financial
        .push(PatrimonyItem::new("Conto corrente", 12_500.0));
    backend.insert_beneficiary(rossi.clone());

    let (api, _) = client_with_counter(backend.clone());
    api.login(TEST_EMAIL, TEST_PASSWORD).expect("login");

    let mut editor = ReportEditor::new();
    editor.select_beneficiary(rossi).unwrap();
    editor.set_start_date(Some(date(2024, 1, 1))).unwrap();
    editor.set_end_date(Some(date(2024, 12, 31))).unwrap();
    editor.set_registry_number("RG 42/2024").unwrap();
    editor.next().unwrap();
    editor
        .add_item_with(EntryKind::Income, "Pensione", "INPS", 1000.0)
        .unwrap();
    editor
        .add_item_with(EntryKind::Expense, "Farmaci", "Farmacia centrale", 300.0)
        .unwrap();
    editor
        .add_item_with(EntryKind::Expense, "Farmaci", "Parafarmacia", 50.0)
        .unwrap();
    assert_eq!(editor.totals().balance, 650.0);
    assert_eq!(editor.patrimony_totals().unwrap().total, 12_500.0);
    let groups = editor.expense_groups();
    assert_eq!(groups[0].descriptions, "Farmacia centrale; Parafarmacia");

    editor.next().unwrap();
    assert!(!editor.save_options_available());
    for declaration in Declaration::ALL {
        editor.set_declaration(declaration, true).unwrap();
    }
    editor.set_place(Some("Milano".into())).unwrap();
    let outcome = editor.save(SaveKind::Final, &api).unwrap();
    let id = outcome.report.id.clone();
    assert_eq!(outcome.follow_up, Route::ReportDetail(id.clone()));

    let mut reports = ReportStore::new(api.clone());
    reports.ensure_loaded().unwrap();
    assert_eq!(reports.page().items.len(), 1);
    assert_eq!(reports.page().items[0].state, ReportState::Completed);
    reports.set_state(&id, ReportState::Sent).unwrap();

    let sent = reports.get(&id).unwrap();
    assert!(matches!(
        ReportEditor::edit(&sent, None),
        Err(CoreError::ReportLocked(_))
    ));

    let mut beneficiaries = BeneficiaryStore::new(api.clone());
    assert_eq!(
        beneficiaries.delete("ben-1").unwrap(),
        crate::DeleteOutcome::Deactivated
    );
    assert!(beneficiaries.selectable().unwrap().is_empty());
}

#[test]
fn expired_token_logs_out_and_fires_handler_once() {
    let backend = Arc::new(FakeBackend::new());
    let (api, fired) = client_with_counter(backend.clone());
    api.login(TEST_EMAIL, TEST_PASSWORD).expect("login");
    let mut reports = ReportStore::new(api.clone());
    reports.fetch().unwrap();

    backend.expire_tokens();
    assert!(matches!(reports.fetch(), Err(CoreError::Unauthorized)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!api.is_authenticated());

    // No session left: the call is refused before reaching the backend.
    let before = backend.calls().len();
    assert!(matches!(reports.fetch(), Err(CoreError::Unauthorized)));
    assert_eq!(backend.calls().len(), before);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn session_survives_restore_through_storage() {
    let backend = Arc::new(FakeBackend::new());
    let storage = Arc::new(MemorySessionStorage::new());
    let api = ApiClient::new(backend.clone(), Box::new(storage.clone()));
    api.login(TEST_EMAIL, TEST_PASSWORD).unwrap();
    assert!(storage.load().unwrap().is_some());

    let restored = ApiClient::new(backend, Box::new(storage.clone()));
    assert!(restored.restore().unwrap());
    assert_eq!(restored.current_user().unwrap().email, TEST_EMAIL);

    restored.logout();
    assert!(storage.load().unwrap().is_none());
}

#[test]
fn wrong_login_is_a_backend_error_not_a_logout() {
    let backend = Arc::new(FakeBackend::new());
    let (api, fired) = client_with_counter(backend);
    let err = api.login(TEST_EMAIL, "nope").unwrap_err();
    assert!(matches!(err, CoreError::Api { status: 400, .. }));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn declaration_gate_blocks_every_save_kind() {
    let backend = Arc::new(FakeBackend::new());
    let (api, _) = client_with_counter(backend.clone());
    api.login(TEST_EMAIL, TEST_PASSWORD).unwrap();

    let mut editor = ReportEditor::new();
    editor.jump_to_step(EditorStep::Signing.index()).unwrap();
    editor
        .set_declaration(Declaration::Truthfulness, true)
        .unwrap();
    editor
        .set_declaration(Declaration::AdministratorSignature, true)
        .unwrap();
    for kind in [SaveKind::Draft, SaveKind::Final, SaveKind::PdfExport] {
        assert!(matches!(
            editor.save(kind, &api),
            Err(CoreError::DeclarationsIncomplete)
        ));
    }
    assert_eq!(backend.call_count("create_report"), 0);
}
