//! The authenticated support administrator and their signature image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::beneficiary::join_name;
use crate::common::*;

/// Court-appointed administrator using the application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Administrator {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "nome", default)]
    pub first_name: String,
    #[serde(rename = "cognome", default)]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "codiceFiscale", default, skip_serializing_if = "Option::is_none")]
    pub fiscal_code: Option<String>,
    #[serde(rename = "qualifica", default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(rename = "tribunale", default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(rename = "firmaDigitale", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureImage>,
}

impl Administrator {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }

    pub fn has_signature(&self) -> bool {
        self.signature.is_some()
    }
}

impl Identifiable for Administrator {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Displayable for Administrator {
    fn display_label(&self) -> String {
        format!("{} <{}>", self.full_name(), self.email)
    }
}

/// Reference to the uploaded signature image held by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureImage {
    #[serde(rename = "immagine")]
    pub url: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "caricataIl", default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_parses_optional_signature() {
        let json = r#"{
            "_id": "u1", "nome": "Laura", "cognome": "Verdi", "email": "laura@example.it",
            "firmaDigitale": {"immagine": "/uploads/firme/u1.png", "mimeType": "image/png"}
        }"#;
        let admin: Administrator = serde_json::from_str(json).expect("parse administrator");
        assert_eq!(admin.full_name(), "Laura Verdi");
        assert!(admin.has_signature());
        assert_eq!(admin.display_label(), "Laura Verdi <laura@example.it>");
    }
}
