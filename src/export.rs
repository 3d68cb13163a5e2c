//! PDF export: fetch everything a report page needs, render, write to disk.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use ads_core::{ApiClient, Clock, CoreError, CoreResult, DocumentRenderer, ImageData, ReportDocument};
use ads_domain::Report;
use tracing::{info, warn};

use crate::AppResult;

/// A rendered report: the suggested file name and the PDF bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A rendered report already written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub path: PathBuf,
}

/// Loads the report with its beneficiary and administrator and renders it.
///
/// Signed reports embed the image recorded when the signature was applied,
/// not the administrator's current one. Failing to fetch it leaves a blank
/// signature box, except for an expired session.
pub fn render_report(
    api: &ApiClient,
    renderer: &dyn DocumentRenderer,
    clock: &dyn Clock,
    report_id: &str,
) -> CoreResult<RenderedReport> {
    let report = api.call(|backend, ctx| backend.get_report(ctx, report_id))?;
    let beneficiary =
        api.call(|backend, ctx| backend.get_beneficiary(ctx, report.beneficiary_id()))?;
    let administrator = match api.current_user() {
        Some(user) => user,
        None => api.call(|backend, ctx| backend.current_user(ctx))?,
    };
    let signature = signature_for(api, &report)?;

    let document = ReportDocument::build(&report, &beneficiary, &administrator, signature, clock);
    let bytes = renderer.render(&document)?;
    Ok(RenderedReport {
        file_name: document.file_name,
        bytes,
    })
}

fn signature_for(api: &ApiClient, report: &Report) -> CoreResult<Option<ImageData>> {
    let Some(application) = report.signing.signature.as_ref() else {
        return Ok(None);
    };
    match api.call(|backend, ctx| backend.stored_image(ctx, &application.image)) {
        Ok(Some(image)) => Ok(Some(image)),
        Ok(None) => {
            warn!(report = %report.id, image = %application.image, "signature image no longer stored, leaving a blank box");
            Ok(None)
        }
        Err(CoreError::Unauthorized) => Err(CoreError::Unauthorized),
        Err(err) => {
            warn!(report = %report.id, error = %err, "signature image unavailable, leaving a blank box");
            Ok(None)
        }
    }
}

/// Writes `bytes` as `dir/file_name`, creating the directory when needed.
pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let tmp = path.with_extension("pdf.tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Renders the report and stores it under `dir`.
pub fn export_report_pdf(
    api: &ApiClient,
    renderer: &dyn DocumentRenderer,
    clock: &dyn Clock,
    report_id: &str,
    dir: &Path,
) -> AppResult<ExportedPdf> {
    let rendered = render_report(api, renderer, clock, report_id)?;
    let path = write_export(dir, &rendered.file_name, &rendered.bytes)?;
    info!(report = report_id, path = %path.display(), size = rendered.bytes.len(), "report exported");
    Ok(ExportedPdf {
        file_name: rendered.file_name,
        bytes: rendered.bytes,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_export_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out");
        let path = write_export(&target, "Rendiconto_Rossi_2024.pdf", b"%PDF-1.3").unwrap();
        assert_eq!(path, target.join("Rendiconto_Rossi_2024.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.3");
        assert!(!target.join("Rendiconto_Rossi_2024.pdf.tmp").exists());
    }
}
