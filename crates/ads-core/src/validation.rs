//! Field-scoped validation rules for reports, beneficiaries and categories.
//!
//! Errors are collected, never raised one at a time: every rule runs and the
//! caller receives a [`ValidationErrors`] map keyed by typed field paths.

use std::fmt;

use ads_domain::{Declaration, EntryKind, PatrimonyKind};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::editor::ReportDraft;

pub const MAX_REGISTRY_NUMBER_LEN: usize = 50;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_CATEGORY_DESCRIPTION_LEN: usize = 200;

/// 6 letters, 2 digits, 1 letter, 2 digits, 1 letter, 3 digits, 1 letter.
static FISCAL_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{6}[0-9]{2}[A-Z][0-9]{2}[A-Z][0-9]{3}[A-Z]$").expect("valid fiscal code regex")
});

static HEX_COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

static POSTAL_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5}$").expect("valid postal code regex"));

/// Trims and upper-cases a fiscal code the way it is stored.
pub fn normalize_fiscal_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn is_valid_fiscal_code(raw: &str) -> bool {
    FISCAL_CODE_PATTERN.is_match(&normalize_fiscal_code(raw))
}

pub fn is_valid_hex_color(raw: &str) -> bool {
    HEX_COLOR_PATTERN.is_match(raw.trim())
}

pub fn is_valid_postal_code(raw: &str) -> bool {
    POSTAL_CODE_PATTERN.is_match(raw.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Category,
    Description,
    Amount,
}

/// Addressable fields of the report editor draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportField {
    Beneficiary,
    StartDate,
    EndDate,
    RegistryNumber,
    Item {
        kind: EntryKind,
        index: usize,
        field: ItemField,
    },
    Declaration(Declaration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeneficiaryField {
    FirstName,
    LastName,
    FiscalCode,
    BirthDate,
    PostalCode,
    Province,
    PatrimonyItem { kind: PatrimonyKind, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Name,
    Color,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
    Report(ReportField),
    Beneficiary(BeneficiaryField),
    Category(CategoryField),
}

impl From<ReportField> for FieldPath {
    fn from(value: ReportField) -> Self {
        FieldPath::Report(value)
    }
}

impl From<BeneficiaryField> for FieldPath {
    fn from(value: BeneficiaryField) -> Self {
        FieldPath::Beneficiary(value)
    }
}

impl From<CategoryField> for FieldPath {
    fn from(value: CategoryField) -> Self {
        FieldPath::Category(value)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Report(field) => match field {
                ReportField::Beneficiary => f.write_str("beneficiario"),
                ReportField::StartDate => f.write_str("datiGenerali.dataInizio"),
                ReportField::EndDate => f.write_str("datiGenerali.dataFine"),
                ReportField::RegistryNumber => f.write_str("datiGenerali.rg"),
                ReportField::Item { kind, index, field } => {
                    let list = match kind {
                        EntryKind::Income => "entrate",
                        EntryKind::Expense => "uscite",
                    };
                    let leaf = match field {
                        ItemField::Category => "categoria",
                        ItemField::Description => "descrizione",
                        ItemField::Amount => "importo",
                    };
                    write!(f, "contoEconomico.{list}[{index}].{leaf}")
                }
                ReportField::Declaration(declaration) => {
                    let leaf = match declaration {
                        Declaration::Truthfulness => "veridicita",
                        Declaration::DataProcessingConsent => "consensoTrattamento",
                        Declaration::AdministratorSignature => "firmaAmministratore",
                    };
                    write!(f, "firma.dichiarazioni.{leaf}")
                }
            },
            FieldPath::Beneficiary(field) => match field {
                BeneficiaryField::FirstName => f.write_str("nome"),
                BeneficiaryField::LastName => f.write_str("cognome"),
                BeneficiaryField::FiscalCode => f.write_str("codiceFiscale"),
                BeneficiaryField::BirthDate => f.write_str("dataNascita"),
                BeneficiaryField::PostalCode => f.write_str("indirizzo.cap"),
                BeneficiaryField::Province => f.write_str("indirizzo.provincia"),
                BeneficiaryField::PatrimonyItem { kind, index } => {
                    let list = match kind {
                        PatrimonyKind::RealEstate => "beniImmobili",
                        PatrimonyKind::MovableGoods => "beniMobili",
                        PatrimonyKind::Financial => "titoliConti",
                    };
                    write!(f, "patrimonio.{list}[{index}]")
                }
            },
            FieldPath::Category(field) => match field {
                CategoryField::Name => f.write_str("nome"),
                CategoryField::Color => f.write_str("colore"),
                CategoryField::Description => f.write_str("descrizione"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FieldPath,
    pub message: String,
}

/// Ordered collection of field errors. One message per field; later rules
/// do not overwrite the first failure recorded for a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<FieldPath>, message: impl Into<String>) {
        let field = field.into();
        if self.contains(field) {
            return;
        }
        self.entries.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field: impl Into<FieldPath>) -> bool {
        let field = field.into();
        self.entries.iter().any(|entry| entry.field == field)
    }

    pub fn get(&self, field: impl Into<FieldPath>) -> Option<&str> {
        let field = field.into();
        self.entries
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.message.as_str())
    }

    pub fn remove(&mut self, field: impl Into<FieldPath>) {
        let field = field.into();
        self.entries.retain(|entry| entry.field != field);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&FieldPath) -> bool) {
        self.entries.retain(|entry| keep(&entry.field));
    }

    /// Rewrites every field path; entries mapped to `None` are dropped.
    pub fn remap(&mut self, mut map: impl FnMut(FieldPath) -> Option<FieldPath>) {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .filter_map(|entry| {
                map(entry.field).map(|field| FieldError {
                    field,
                    message: entry.message,
                })
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.entries.iter()
    }

    /// Report fields only, in recording order.
    pub fn report_fields(&self) -> impl Iterator<Item = ReportField> + '_ {
        self.entries.iter().filter_map(|entry| match entry.field {
            FieldPath::Report(field) => Some(field),
            _ => None,
        })
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}: {}", entry.field, entry.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Runs every cross-step rule of the report editor.
///
/// Declarations are not checked here: the save gate handles them before
/// validation ever runs.
pub fn validate_report(draft: &ReportDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if draft
        .beneficiary_id
        .as_deref()
        .map_or(true, |id| id.trim().is_empty())
    {
        errors.push(ReportField::Beneficiary, "Seleziona un beneficiario");
    }

    let start = draft.general.start_date;
    let end = draft.general.end_date;
    if start.is_none() {
        errors.push(ReportField::StartDate, "La data di inizio è obbligatoria");
    }
    match (start, end) {
        (_, None) => errors.push(ReportField::EndDate, "La data di fine è obbligatoria"),
        (Some(start), Some(end)) if end <= start => errors.push(
            ReportField::EndDate,
            "La data di fine deve essere successiva alla data di inizio",
        ),
        _ => {}
    }

    let registry = draft.general.registry_number.trim();
    if registry.is_empty() {
        errors.push(ReportField::RegistryNumber, "Il numero R.G. è obbligatorio");
    } else if registry.chars().count() > MAX_REGISTRY_NUMBER_LEN {
        errors.push(
            ReportField::RegistryNumber,
            format!("Il numero R.G. non può superare {MAX_REGISTRY_NUMBER_LEN} caratteri"),
        );
    }

    for kind in EntryKind::ALL {
        for (index, item) in draft.items(kind).iter().enumerate() {
            let field = |field| ReportField::Item { kind, index, field };
            if item.category.trim().is_empty() {
                errors.push(field(ItemField::Category), "La categoria è obbligatoria");
            }
            if item.description.trim().is_empty() {
                errors.push(field(ItemField::Description), "La descrizione è obbligatoria");
            }
            if !item.amount.is_finite() {
                errors.push(field(ItemField::Amount), "Importo non valido");
            } else if item.amount < 0.0 {
                errors.push(field(ItemField::Amount), "L'importo non può essere negativo");
            }
        }
    }

    errors
}

/// Checks a custom category before it is sent to the backend.
pub fn validate_category(
    name: &str,
    color: &str,
    description: Option<&str>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let name = name.trim();
    if name.is_empty() {
        errors.push(CategoryField::Name, "Il nome è obbligatorio");
    } else if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        errors.push(
            CategoryField::Name,
            format!("Il nome non può superare {MAX_CATEGORY_NAME_LEN} caratteri"),
        );
    }
    if !is_valid_hex_color(color) {
        errors.push(CategoryField::Color, "Colore non valido (formato #RRGGBB)");
    }
    if description.map_or(0, |text| text.trim().chars().count()) > MAX_CATEGORY_DESCRIPTION_LEN {
        errors.push(
            CategoryField::Description,
            format!("La descrizione non può superare {MAX_CATEGORY_DESCRIPTION_LEN} caratteri"),
        );
    }
    errors
}
