mod common;

use std::fs;
use std::sync::Mutex;

use ads_core::testing::{TEST_EMAIL, TEST_PASSWORD};
use ads_core::{
    CoreResult, DocumentRenderer, NotificationLevel, ReportDocument, ReportEditor, Route,
    SaveKind, SignatureMark,
};
use ads_domain::{Declaration, EntryKind};
use common::{date, seed_rossi, setup_test_env};
use rendiconti::export::render_report;

const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn saved_report(app: &mut rendiconti::Application, env: &common::TestEnv, kind: SaveKind) -> String {
    let rossi = seed_rossi(env);
    let mut editor = ReportEditor::new();
    editor.select_beneficiary(rossi).unwrap();
    editor.set_start_date(Some(date(2024, 1, 1))).unwrap();
    editor.set_end_date(Some(date(2024, 12, 31))).unwrap();
    editor.set_registry_number("RG 7/2024").unwrap();
    editor
        .add_item_with(EntryKind::Income, "Pensione", "INPS", 1_200.0)
        .unwrap();
    editor
        .add_item_with(EntryKind::Expense, "Affitto", "Canone", 450.0)
        .unwrap();
    for declaration in Declaration::ALL {
        editor.set_declaration(declaration, true).unwrap();
    }
    app.save_report(&mut editor, kind).expect("saved").report.id
}

#[test]
fn pdf_export_save_offers_export_and_writes_the_file() {
    let env = setup_test_env();
    let mut app = env.app();
    app.start();
    app.login(TEST_EMAIL, TEST_PASSWORD).expect("login");

    let id = saved_report(&mut app, &env, SaveKind::PdfExport);
    assert_eq!(app.route(), &Route::ReportDetail(id.clone()));

    let exported = app.export_report_pdf(&id).expect("exported");
    assert_eq!(exported.file_name, "Rendiconto_Rossi_2024.pdf");
    assert_eq!(exported.path, env.export_dir().join("Rendiconto_Rossi_2024.pdf"));
    assert!(exported.bytes.starts_with(b"%PDF"));
    assert_eq!(fs::read(&exported.path).unwrap(), exported.bytes);
    assert_eq!(
        app.notifications().last().map(|n| n.level),
        Some(NotificationLevel::Success)
    );
}

/// Records the signature mark of every document instead of drawing it.
#[derive(Default)]
struct CapturingRenderer {
    marks: Mutex<Vec<SignatureMark>>,
}

impl DocumentRenderer for CapturingRenderer {
    fn render(&self, document: &ReportDocument) -> CoreResult<Vec<u8>> {
        self.marks
            .lock()
            .unwrap()
            .push(document.summary.signature.clone());
        Ok(b"%PDF-1.3".to_vec())
    }
}

impl CapturingRenderer {
    fn last(&self) -> Option<SignatureMark> {
        self.marks.lock().unwrap().last().cloned()
    }
}

fn png(tail: u8) -> Vec<u8> {
    let mut bytes = PNG_HEADER.to_vec();
    bytes.extend_from_slice(&[0, 0, 0, tail]);
    bytes
}

#[test]
fn signed_report_embeds_the_image_recorded_at_signing() {
    let env = setup_test_env();
    let mut app = env.app();
    app.start();
    app.login(TEST_EMAIL, TEST_PASSWORD).expect("login");
    let id = saved_report(&mut app, &env, SaveKind::Final);

    app.profile
        .upload_signature("firma.png", png(1), TEST_PASSWORD)
        .expect("uploaded");
    let applied = app.apply_signature(&id, TEST_PASSWORD).expect("applied");
    assert_eq!(applied.image, "/uploads/firme/firma.png");

    // The profile signature changes after the report was signed.
    app.profile.delete_signature(TEST_PASSWORD).expect("deleted");
    app.profile
        .upload_signature("nuova.png", png(2), TEST_PASSWORD)
        .expect("replaced");

    let renderer = CapturingRenderer::default();
    render_report(app.api(), &renderer, app.clock(), &id).expect("rendered");
    match renderer.last() {
        Some(SignatureMark::Image(image)) => assert_eq!(image.bytes, png(1)),
        other => panic!("unexpected signature mark {other:?}"),
    }
    assert_eq!(env.backend.call_count("stored_image"), 1);
    assert_eq!(env.backend.call_count("signature_image"), 0);

    // The bytes are not a decodable PNG: the real renderer draws a blank box.
    let exported = app.export_report_pdf(&id).expect("exported");
    assert!(exported.bytes.starts_with(b"%PDF"));
}

#[test]
fn missing_stored_signature_leaves_a_blank_box() {
    let env = setup_test_env();
    let mut app = env.app();
    app.start();
    app.login(TEST_EMAIL, TEST_PASSWORD).expect("login");
    let id = saved_report(&mut app, &env, SaveKind::Final);
    app.profile
        .upload_signature("firma.png", png(1), TEST_PASSWORD)
        .expect("uploaded");
    app.apply_signature(&id, TEST_PASSWORD).expect("applied");
    env.backend.forget_stored_images();

    let renderer = CapturingRenderer::default();
    render_report(app.api(), &renderer, app.clock(), &id).expect("rendered");
    assert_eq!(renderer.last(), Some(SignatureMark::Blank));
}

#[test]
fn unsigned_report_skips_the_signature_request() {
    let env = setup_test_env();
    let mut app = env.app();
    app.start();
    app.login(TEST_EMAIL, TEST_PASSWORD).expect("login");
    let id = saved_report(&mut app, &env, SaveKind::Draft);

    app.export_report_pdf(&id).expect("exported");
    assert_eq!(env.backend.call_count("stored_image"), 0);
}

#[test]
fn export_of_missing_report_returns_to_the_list() {
    let env = setup_test_env();
    let mut app = env.app();
    app.start();
    app.login(TEST_EMAIL, TEST_PASSWORD).expect("login");

    assert!(app.export_report_pdf("nope").is_none());
    assert_eq!(app.route(), &Route::Reports);
    assert!(!env.export_dir().exists());
}
