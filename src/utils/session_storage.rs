use ads_config::{ConfigError, SessionFile};
use ads_core::{CoreError, CoreResult, Session, SessionStorage};
use tracing::warn;

/// Keeps the session in a JSON file so it survives restarts.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    file: SessionFile,
}

impl FileSessionStorage {
    pub fn new(file: SessionFile) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &SessionFile {
        &self.file
    }
}

fn storage_error(err: ConfigError) -> CoreError {
    warn!(error = %err, "session file unavailable");
    CoreError::InvalidOperation(format!("session storage: {err}"))
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> CoreResult<Option<Session>> {
        self.file.load().map_err(storage_error)
    }

    fn save(&self, session: &Session) -> CoreResult<()> {
        self.file.save(session).map_err(storage_error)
    }

    fn clear(&self) -> CoreResult<()> {
        self.file.clear().map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ads_core::testing::test_administrator;

    #[test]
    fn session_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSessionStorage::new(SessionFile::new(dir.path().join("session.json")));
        assert!(storage.load().unwrap().is_none());

        let session = Session {
            token: "tok-1".into(),
            user: test_administrator(),
        };
        storage.save(&session).unwrap();
        assert_eq!(storage.load().unwrap(), Some(session));

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        assert!(!storage.file().path().exists());
    }
}
