//! Domain types representing the income/expense category taxonomy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::*;

pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

/// Classifies report line items for grouping and summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub kind: CategoryKind,
    #[serde(rename = "descrizione", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "colore", default = "default_color")]
    pub color: String,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

impl Category {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            description: None,
            color: default_color(),
            is_default: false,
        }
    }

    /// Default categories are provided by the backend and cannot be changed.
    pub fn is_editable(&self) -> bool {
        !self.is_default
    }
}

impl Identifiable for Category {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NamedEntity for Category {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Category {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}

/// Supported category types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_query_value(self) -> &'static str {
        match self {
            CategoryKind::Income => "INCOME",
            CategoryKind::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CategoryKind::Income => "Entrata",
            CategoryKind::Expense => "Uscita",
        };
        f.write_str(label)
    }
}
