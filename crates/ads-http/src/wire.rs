//! Response envelopes and status mapping for the REST backend.

use ads_core::{CoreError, CoreResult, DeleteOutcome, Page};
use serde::{de::DeserializeOwned, Deserialize};

/// Bodies arrive either bare or wrapped in `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped {
        #[serde(alias = "user", alias = "utente")]
        data: T,
    },
    Bare(T),
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> CoreResult<T> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(match envelope {
        Envelope::Wrapped { data } => data,
        Envelope::Bare(value) => value,
    })
}

#[derive(Deserialize)]
struct PagedBody<T> {
    #[serde(alias = "data", alias = "beneficiari", alias = "rendiconti")]
    items: Vec<T>,
    #[serde(alias = "totale", default)]
    total: Option<u64>,
    #[serde(alias = "pagina", default)]
    page: Option<u32>,
    #[serde(alias = "totalPages", alias = "pagine", default)]
    pages: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody<T> {
    List(Vec<T>),
    Paged(PagedBody<T>),
}

/// Listings come either as a bare array or as an object carrying the
/// items plus pagination counters.
pub(crate) fn decode_page<T: DeserializeOwned>(body: &str) -> CoreResult<Page<T>> {
    Ok(match serde_json::from_str::<PageBody<T>>(body)? {
        PageBody::List(items) => Page::single(items),
        PageBody::Paged(paged) => {
            let total = paged.total.unwrap_or(paged.items.len() as u64);
            let page = paged.page.unwrap_or(1).max(1);
            Page {
                items: paged.items,
                total,
                page,
                pages: paged.pages.unwrap_or(page).max(1),
            }
        }
    })
}

#[derive(Deserialize)]
struct DeleteBody {
    #[serde(alias = "esito", default)]
    outcome: Option<DeleteOutcome>,
    #[serde(alias = "disattivato", default)]
    deactivated: Option<bool>,
}

/// An empty body means the record is gone.
pub(crate) fn decode_delete(body: &str) -> CoreResult<DeleteOutcome> {
    if body.trim().is_empty() {
        return Ok(DeleteOutcome::Removed);
    }
    let parsed: DeleteBody = decode(body)?;
    Ok(match (parsed.outcome, parsed.deactivated) {
        (Some(outcome), _) => outcome,
        (None, Some(true)) => DeleteOutcome::Deactivated,
        _ => DeleteOutcome::Removed,
    })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "messaggio", alias = "error")]
    message: Option<String>,
}

/// Maps a non-success status to the core error taxonomy.
pub(crate) fn status_error(status: u16, body: &str, resource: &str) -> CoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());
    match status {
        401 => CoreError::Unauthorized,
        404 => CoreError::NotFound(message.unwrap_or_else(|| resource.to_string())),
        _ => CoreError::Api {
            status,
            message: message.unwrap_or_else(|| default_message(status).to_string()),
        },
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Richiesta non valida",
        403 => "Operazione non consentita",
        409 => "Conflitto con lo stato attuale",
        413 => "File troppo grande",
        500..=599 => "Errore del server",
        _ => "Errore imprevisto",
    }
}

/// Human name of the resource behind a path, for not-found messages.
pub(crate) fn resource_name(path: &str) -> &'static str {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    match first {
        "beneficiari" => "Beneficiario",
        "rendiconti" => "Rendiconto",
        "categorie" => "Categoria",
        "auth" => "Profilo",
        _ => "Risorsa",
    }
}
