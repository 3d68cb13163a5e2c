use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ads_core::testing::FakeBackend;
use ads_core::FixedClock;
use ads_domain::{Beneficiary, PatrimonyItem};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rendiconti::config::{ClientConfig, SessionFile};
use rendiconti::pdf::PdfRenderer;
use rendiconti::utils::FileSessionStorage;
use rendiconti::Application;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub struct TestEnv {
    pub backend: Arc<FakeBackend>,
    pub base: PathBuf,
}

impl TestEnv {
    pub fn export_dir(&self) -> PathBuf {
        self.base.join("export")
    }

    /// A fresh application over the same backend and session file, as after
    /// a restart.
    pub fn app(&self) -> Application {
        let config = ClientConfig {
            export_dir: Some(self.export_dir()),
            data_dir: Some(self.base.join("data")),
            ..ClientConfig::default()
        };
        let storage =
            FileSessionStorage::new(SessionFile::new(self.base.join("data").join("session.json")));
        Application::with_parts(
            config,
            self.backend.clone(),
            Box::new(storage),
            Box::new(PdfRenderer::new()),
            Box::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())),
        )
    }
}

/// Creates an isolated environment backed by a unique directory.
pub fn setup_test_env() -> TestEnv {
    rendiconti::init();
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    TestEnv {
        backend: Arc::new(FakeBackend::new()),
        base,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Seeds Mario Rossi with a bank account and returns him.
pub fn seed_rossi(env: &TestEnv) -> Beneficiary {
    let mut rossi = Beneficiary::new("ben-rossi", "Mario", "Rossi");
    rossi.fiscal_code = "RSSMRA80A01F205X".into();
    rossi
        .patrimony
        .financial
        .push(PatrimonyItem::new("Conto corrente", 12_500.0));
    env.backend.insert_beneficiary(rossi.clone());
    rossi
}
