//! Domain types describing the people under support administration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::patrimony::Patrimony;

/// Postal address as stored by the backend. Every part is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    #[serde(rename = "via", default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(rename = "cap", default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(rename = "citta", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "provincia", default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        [
            &self.street,
            &self.postal_code,
            &self.city,
            &self.province,
        ]
        .iter()
        .all(|part| non_blank(part.as_deref()).is_none())
    }
}

/// A person whose finances are reported to the court.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Beneficiary {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "nome")]
    pub first_name: String,
    #[serde(rename = "cognome")]
    pub last_name: String,
    #[serde(rename = "codiceFiscale", default)]
    pub fiscal_code: String,
    #[serde(
        rename = "dataNascita",
        default,
        deserialize_with = "lenient_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "luogoNascita", default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(rename = "indirizzo", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "note", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        rename = "condizioniPersonali",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub personal_conditions: Option<String>,
    #[serde(rename = "patrimonio", default)]
    pub patrimony: Patrimony,
    #[serde(rename = "attivo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Beneficiary {
    pub fn new(
        id: impl Into<EntityId>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            fiscal_code: String::new(),
            birth_date: None,
            birth_place: None,
            address: None,
            notes: None,
            personal_conditions: None,
            patrimony: Patrimony::default(),
            active: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// "Nome Cognome", skipping blank parts.
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }

    /// Only active beneficiaries may be attached to new reports.
    pub fn is_selectable(&self) -> bool {
        self.active
    }
}

impl Identifiable for Beneficiary {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Beneficiary {
    fn name(&self) -> &str {
        &self.last_name
    }
}

impl Displayable for Beneficiary {
    fn display_label(&self) -> String {
        if self.fiscal_code.is_empty() {
            self.full_name()
        } else {
            format!("{} ({})", self.full_name(), self.fiscal_code)
        }
    }
}

/// Reduced beneficiary view the backend embeds in report listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeneficiarySummary {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "nome", default)]
    pub first_name: String,
    #[serde(rename = "cognome", default)]
    pub last_name: String,
    #[serde(rename = "codiceFiscale", default, skip_serializing_if = "Option::is_none")]
    pub fiscal_code: Option<String>,
}

impl BeneficiarySummary {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

impl From<&Beneficiary> for BeneficiarySummary {
    fn from(value: &Beneficiary) -> Self {
        Self {
            id: value.id.clone(),
            first_name: value.first_name.clone(),
            last_name: value.last_name.clone(),
            fiscal_code: non_blank(Some(&value.fiscal_code)).map(str::to_string),
        }
    }
}

pub(crate) fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beneficiary_parses_backend_payload() {
        let json = r#"{
            "_id": "b1",
            "nome": "Mario",
            "cognome": "Rossi",
            "codiceFiscale": "RSSMRA80A01F205X",
            "dataNascita": "1980-01-01",
            "indirizzo": {"via": "Via Roma 1", "citta": "Milano"},
            "patrimonio": {"beniMobili": [{"descrizione": "Auto", "valore": 4000}]}
        }"#;
        let beneficiary: Beneficiary = serde_json::from_str(json).expect("parse beneficiary");
        assert_eq!(beneficiary.id, "b1");
        assert_eq!(beneficiary.full_name(), "Mario Rossi");
        assert!(beneficiary.active, "missing flag defaults to active");
        assert_eq!(beneficiary.patrimony.movable_goods[0].value, 4000.0);
        let address = beneficiary.address.expect("address present");
        assert_eq!(address.city.as_deref(), Some("Milano"));
        assert!(address.postal_code.is_none());
    }

    #[test]
    fn address_emptiness_ignores_whitespace() {
        let address = Address {
            street: Some("   ".into()),
            ..Address::default()
        };
        assert!(address.is_empty());
        assert!(Address::default().is_empty());
    }

    #[test]
    fn display_label_includes_fiscal_code_when_present() {
        let mut beneficiary = Beneficiary::new("b2", "Anna", "Bianchi");
        assert_eq!(beneficiary.display_label(), "Anna Bianchi");
        beneficiary.fiscal_code = "BNCNNA70C41H501Z".into();
        assert_eq!(beneficiary.display_label(), "Anna Bianchi (BNCNNA70C41H501Z)");
    }
}
