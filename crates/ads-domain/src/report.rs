//! Domain models for court reports (rendiconti) and their signing block.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::beneficiary::BeneficiarySummary;
use crate::category::CategoryKind;
use crate::common::*;

/// Periodic financial report about one beneficiary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "beneficiario")]
    pub beneficiary: BeneficiaryRef,
    #[serde(rename = "datiGenerali", default)]
    pub general: GeneralData,
    #[serde(rename = "contoEconomico", default)]
    pub account: EconomicAccount,
    #[serde(rename = "firma", default)]
    pub signing: SigningBlock,
    #[serde(rename = "stato", default)]
    pub state: ReportState,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn beneficiary_id(&self) -> &str {
        self.beneficiary.id()
    }

    /// Sent reports are frozen: no further edits are offered.
    pub fn is_editable(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Reference year of the report: the end date's year, else the start date's.
    pub fn reference_year(&self) -> Option<i32> {
        self.general
            .end_date
            .or(self.general.start_date)
            .map(|date| date.year())
    }
}

impl Identifiable for Report {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Displayable for Report {
    fn display_label(&self) -> String {
        let who = match &self.beneficiary {
            BeneficiaryRef::Populated(summary) => summary.full_name(),
            BeneficiaryRef::Id(id) => id.clone(),
        };
        match self.reference_year() {
            Some(year) => format!("Rendiconto {year} - {who} [{}]", self.state),
            None => format!("Rendiconto - {who} [{}]", self.state),
        }
    }
}

/// The backend either embeds the beneficiary or returns only its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BeneficiaryRef {
    Populated(BeneficiarySummary),
    Id(EntityId),
}

impl BeneficiaryRef {
    pub fn id(&self) -> &str {
        match self {
            BeneficiaryRef::Populated(summary) => &summary.id,
            BeneficiaryRef::Id(id) => id,
        }
    }

    pub fn summary(&self) -> Option<&BeneficiarySummary> {
        match self {
            BeneficiaryRef::Populated(summary) => Some(summary),
            BeneficiaryRef::Id(_) => None,
        }
    }
}

/// Reporting period and court registry reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralData {
    #[serde(
        rename = "dataInizio",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        rename = "dataFine",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "rg", default)]
    pub registry_number: String,
}

/// One income or expense line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EconomicItem {
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "descrizione", default)]
    pub description: String,
    #[serde(rename = "importo", default, deserialize_with = "lenient_amount")]
    pub amount: f64,
}

impl EconomicItem {
    pub fn new(category: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            amount,
        }
    }
}

impl Amounted for EconomicItem {
    fn amount(&self) -> f64 {
        finite_or_zero(self.amount)
    }
}

impl Described for EconomicItem {
    fn description(&self) -> Option<&str> {
        non_blank(Some(&self.description))
    }
}

/// Income and expense lists of a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EconomicAccount {
    #[serde(rename = "entrate", default)]
    pub income: Vec<EconomicItem>,
    #[serde(rename = "uscite", default)]
    pub expenses: Vec<EconomicItem>,
}

impl EconomicAccount {
    pub fn items(&self, kind: EntryKind) -> &[EconomicItem] {
        match kind {
            EntryKind::Income => &self.income,
            EntryKind::Expense => &self.expenses,
        }
    }

    pub fn items_mut(&mut self, kind: EntryKind) -> &mut Vec<EconomicItem> {
        match kind {
            EntryKind::Income => &mut self.income,
            EntryKind::Expense => &mut self.expenses,
        }
    }
}

/// Side of the economic account a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub const ALL: [EntryKind; 2] = [EntryKind::Income, EntryKind::Expense];
}

impl From<EntryKind> for CategoryKind {
    fn from(value: EntryKind) -> Self {
        match value {
            EntryKind::Income => CategoryKind::Income,
            EntryKind::Expense => CategoryKind::Expense,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryKind::Income => "Entrate",
            EntryKind::Expense => "Uscite",
        };
        f.write_str(label)
    }
}

/// Declarations the administrator must confirm before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Declaration {
    Truthfulness,
    DataProcessingConsent,
    AdministratorSignature,
}

impl Declaration {
    pub const ALL: [Declaration; 3] = [
        Declaration::Truthfulness,
        Declaration::DataProcessingConsent,
        Declaration::AdministratorSignature,
    ];
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Declaration::Truthfulness => "Dichiarazione di veridicità",
            Declaration::DataProcessingConsent => "Consenso al trattamento dei dati",
            Declaration::AdministratorSignature => "Firma dell'amministratore",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declarations {
    #[serde(rename = "veridicita", default)]
    pub truthfulness: bool,
    #[serde(rename = "consensoTrattamento", default)]
    pub data_processing_consent: bool,
    #[serde(rename = "firmaAmministratore", default)]
    pub administrator_signature: bool,
}

impl Declarations {
    pub fn get(&self, declaration: Declaration) -> bool {
        match declaration {
            Declaration::Truthfulness => self.truthfulness,
            Declaration::DataProcessingConsent => self.data_processing_consent,
            Declaration::AdministratorSignature => self.administrator_signature,
        }
    }

    pub fn set(&mut self, declaration: Declaration, value: bool) {
        match declaration {
            Declaration::Truthfulness => self.truthfulness = value,
            Declaration::DataProcessingConsent => self.data_processing_consent = value,
            Declaration::AdministratorSignature => self.administrator_signature = value,
        }
    }

    pub fn all_confirmed(&self) -> bool {
        Declaration::ALL.iter().all(|declaration| self.get(*declaration))
    }

    pub fn missing(&self) -> Vec<Declaration> {
        Declaration::ALL
            .iter()
            .copied()
            .filter(|declaration| !self.get(*declaration))
            .collect()
    }
}

/// Closing section of a report: declarations, place, date and signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SigningBlock {
    #[serde(rename = "dichiarazioni", default)]
    pub declarations: Declarations,
    #[serde(rename = "luogo", default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(
        rename = "data",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(rename = "note", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "firmaDigitale", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureApplication>,
}

/// Stamp of the administrator's signature image on a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureApplication {
    #[serde(rename = "immagine")]
    pub image: String,
    #[serde(rename = "applicataIl")]
    pub applied_at: DateTime<Utc>,
    #[serde(rename = "nomeAmministratore")]
    pub administrator_full_name: String,
}

/// Report lifecycle. `Sent` is terminal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportState {
    #[default]
    #[serde(rename = "bozza")]
    Draft,
    #[serde(rename = "completato")]
    Completed,
    #[serde(rename = "inviato")]
    Sent,
}

impl ReportState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportState::Sent)
    }

    pub fn as_query_value(self) -> &'static str {
        match self {
            ReportState::Draft => "bozza",
            ReportState::Completed => "completato",
            ReportState::Sent => "inviato",
        }
    }

    /// Whether moving from `self` to `next` is allowed client-side.
    pub fn can_transition_to(self, next: ReportState) -> bool {
        !self.is_terminal() && self != next
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReportState::Draft => "Bozza",
            ReportState::Completed => "Completato",
            ReportState::Sent => "Inviato",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_parses_populated_and_plain_beneficiary_refs() {
        let populated = r#"{
            "_id": "r1",
            "beneficiario": {"_id": "b1", "nome": "Mario", "cognome": "Rossi"},
            "datiGenerali": {"dataInizio": "2024-01-01T00:00:00.000Z", "dataFine": "2024-12-31", "rg": "123/2020"},
            "contoEconomico": {"entrate": [{"categoria": "Pensione", "descrizione": "INPS", "importo": 1000}]},
            "stato": "completato"
        }"#;
        let report: Report = serde_json::from_str(populated).expect("parse report");
        assert_eq!(report.beneficiary_id(), "b1");
        assert_eq!(
            report.beneficiary.summary().map(|s| s.full_name()),
            Some("Mario Rossi".to_string())
        );
        assert_eq!(report.state, ReportState::Completed);
        assert_eq!(report.reference_year(), Some(2024));
        assert_eq!(report.account.income[0].amount, 1000.0);
        assert!(report.account.expenses.is_empty());

        let plain = r#"{"id": "r2", "beneficiario": "b9"}"#;
        let report: Report = serde_json::from_str(plain).expect("parse report");
        assert_eq!(report.beneficiary_id(), "b9");
        assert_eq!(report.state, ReportState::Draft);
        assert!(report.is_editable());
    }

    #[test]
    fn declarations_gate_requires_all_three() {
        let mut declarations = Declarations::default();
        assert!(!declarations.all_confirmed());
        for declaration in Declaration::ALL {
            declarations.set(declaration, true);
        }
        assert!(declarations.all_confirmed());
        declarations.set(Declaration::DataProcessingConsent, false);
        assert!(!declarations.all_confirmed());
        assert_eq!(declarations.missing(), vec![Declaration::DataProcessingConsent]);
    }

    #[test]
    fn sent_state_is_terminal() {
        assert!(ReportState::Sent.is_terminal());
        assert!(!ReportState::Sent.can_transition_to(ReportState::Draft));
        assert!(ReportState::Draft.can_transition_to(ReportState::Sent));
        assert!(!ReportState::Completed.can_transition_to(ReportState::Completed));
    }
}
