//! Client-side checks for the administrator's digital signature.

use std::path::Path;

use ads_domain::{Administrator, Report};

use crate::backend::ImageData;
use crate::{CoreError, CoreResult};

pub const MAX_SIGNATURE_BYTES: usize = 2 * 1024 * 1024;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    Png,
    Jpeg,
}

impl SignatureFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            SignatureFormat::Png => "image/png",
            SignatureFormat::Jpeg => "image/jpeg",
        }
    }

    fn from_extension(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(SignatureFormat::Png),
            "jpg" | "jpeg" => Some(SignatureFormat::Jpeg),
            _ => None,
        }
    }

    /// Sniffs the format from the leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(SignatureFormat::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(SignatureFormat::Jpeg)
        } else {
            None
        }
    }
}

fn require_password(password: &str) -> CoreResult<()> {
    if password.is_empty() {
        return Err(CoreError::InvalidOperation(
            "la password è obbligatoria per confermare l'operazione".into(),
        ));
    }
    Ok(())
}

/// Validates a signature file and packages it for upload.
///
/// The extension must be png, jpg or jpeg and agree with the file content.
pub fn prepare_upload(file_name: &str, bytes: Vec<u8>, password: &str) -> CoreResult<ImageData> {
    require_password(password)?;
    if bytes.is_empty() {
        return Err(CoreError::InvalidOperation("il file della firma è vuoto".into()));
    }
    if bytes.len() > MAX_SIGNATURE_BYTES {
        return Err(CoreError::InvalidOperation(
            "il file della firma supera i 2 MB".into(),
        ));
    }
    let declared = SignatureFormat::from_extension(file_name).ok_or_else(|| {
        CoreError::InvalidOperation("formato non supportato: usa PNG o JPG".into())
    })?;
    match SignatureFormat::detect(&bytes) {
        Some(actual) if actual == declared => {}
        _ => {
            return Err(CoreError::InvalidOperation(
                "il contenuto del file non corrisponde al formato dichiarato".into(),
            ))
        }
    }
    Ok(ImageData {
        bytes,
        mime_type: declared.mime_type().to_string(),
        file_name: file_name.to_string(),
    })
}

pub fn check_removal(user: &Administrator, password: &str) -> CoreResult<()> {
    require_password(password)?;
    if !user.has_signature() {
        return Err(CoreError::InvalidOperation("nessuna firma da eliminare".into()));
    }
    Ok(())
}

/// Applying needs an uploaded signature and a report that was not sent yet.
pub fn check_application(user: &Administrator, report: &Report, password: &str) -> CoreResult<()> {
    require_password(password)?;
    if !user.has_signature() {
        return Err(CoreError::InvalidOperation(
            "carica prima la tua firma digitale dal profilo".into(),
        ));
    }
    if !report.is_editable() {
        return Err(CoreError::ReportLocked(report.id.clone()));
    }
    Ok(())
}
