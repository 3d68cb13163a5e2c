use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{ClientConfig, ConfigError, SessionFile};

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";
const TMP_SUFFIX: &str = "tmp";

/// Persists [`ClientConfig`] under a base directory and hands out the
/// session file living next to it.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_dir: PathBuf,
}

impl ConfigManager {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        Ok(Self::new(base))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> SessionFile {
        SessionFile::new(self.base_dir.join(SESSION_FILE))
    }

    /// Stored configuration, or defaults when none was saved yet.
    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ClientConfig::default());
        }
        let data = fs::read_to_string(&path)?;
        let config: ClientConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        replace_file(&self.config_path(), &json)
    }
}

/// Writes `data` next to `path` and renames it into place.
pub(crate) fn replace_file(path: &Path, data: &str) -> Result<(), ConfigError> {
    let tmp = tmp_path(path);
    write_all(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_all(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
