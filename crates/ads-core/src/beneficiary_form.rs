//! Editable beneficiary record with typed setters and client-side rules.

use ads_domain::{non_blank, Address, Beneficiary, Patrimony, PatrimonyItem, PatrimonyKind};
use chrono::NaiveDate;

use crate::backend::BeneficiaryInput;
use crate::totals::{patrimony_advisories, totalize_patrimony, Advisory, PatrimonyTotals};
use crate::validation::{
    is_valid_fiscal_code, is_valid_postal_code, normalize_fiscal_code, BeneficiaryField, FieldPath,
    ValidationErrors,
};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDraft {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub province: String,
}

impl AddressDraft {
    fn from_address(address: Option<&Address>) -> Self {
        let Some(address) = address else {
            return Self::default();
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            street: text(&address.street),
            postal_code: text(&address.postal_code),
            city: text(&address.city),
            province: text(&address.province),
        }
    }

    /// `None` when every part is blank.
    fn to_address(&self) -> Option<Address> {
        let part = |value: &str| non_blank(Some(value)).map(str::to_string);
        let address = Address {
            street: part(&self.street),
            postal_code: part(&self.postal_code),
            city: part(&self.city),
            province: part(&self.province).map(|p| p.to_uppercase()),
        };
        (!address.is_empty()).then_some(address)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeneficiaryDraft {
    pub first_name: String,
    pub last_name: String,
    pub fiscal_code: String,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: String,
    pub address: AddressDraft,
    pub notes: String,
    pub personal_conditions: String,
    pub patrimony: Patrimony,
    errors: ValidationErrors,
}

impl From<&Beneficiary> for BeneficiaryDraft {
    fn from(value: &Beneficiary) -> Self {
        Self {
            first_name: value.first_name.clone(),
            last_name: value.last_name.clone(),
            fiscal_code: value.fiscal_code.clone(),
            birth_date: value.birth_date,
            birth_place: value.birth_place.clone().unwrap_or_default(),
            address: AddressDraft::from_address(value.address.as_ref()),
            notes: value.notes.clone().unwrap_or_default(),
            personal_conditions: value.personal_conditions.clone().unwrap_or_default(),
            patrimony: value.patrimony.clone(),
            errors: ValidationErrors::new(),
        }
    }
}

impl BeneficiaryDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn set_first_name(&mut self, value: impl Into<String>) {
        self.errors.remove(BeneficiaryField::FirstName);
        self.first_name = value.into();
    }

    pub fn set_last_name(&mut self, value: impl Into<String>) {
        self.errors.remove(BeneficiaryField::LastName);
        self.last_name = value.into();
    }

    pub fn set_fiscal_code(&mut self, value: impl Into<String>) {
        self.errors.remove(BeneficiaryField::FiscalCode);
        self.fiscal_code = value.into();
    }

    pub fn set_birth_date(&mut self, value: Option<NaiveDate>) {
        self.errors.remove(BeneficiaryField::BirthDate);
        self.birth_date = value;
    }

    pub fn set_birth_place(&mut self, value: impl Into<String>) {
        self.birth_place = value.into();
    }

    pub fn set_address_street(&mut self, value: impl Into<String>) {
        self.address.street = value.into();
    }

    pub fn set_address_postal_code(&mut self, value: impl Into<String>) {
        self.errors.remove(BeneficiaryField::PostalCode);
        self.address.postal_code = value.into();
    }

    pub fn set_address_city(&mut self, value: impl Into<String>) {
        self.address.city = value.into();
    }

    pub fn set_address_province(&mut self, value: impl Into<String>) {
        self.errors.remove(BeneficiaryField::Province);
        self.address.province = value.into();
    }

    pub fn set_notes(&mut self, value: impl Into<String>) {
        self.notes = value.into();
    }

    pub fn set_personal_conditions(&mut self, value: impl Into<String>) {
        self.personal_conditions = value.into();
    }

    /// Appends an asset line and returns its index.
    pub fn add_patrimony_item(&mut self, kind: PatrimonyKind, item: PatrimonyItem) -> usize {
        let items = self.patrimony.items_mut(kind);
        items.push(item);
        items.len() - 1
    }

    pub fn update_patrimony_item(
        &mut self,
        kind: PatrimonyKind,
        index: usize,
        item: PatrimonyItem,
    ) -> CoreResult<()> {
        let slot = self
            .patrimony
            .items_mut(kind)
            .get_mut(index)
            .ok_or_else(|| CoreError::InvalidOperation(format!("no {kind} row {index}")))?;
        *slot = item;
        self.errors
            .remove(BeneficiaryField::PatrimonyItem { kind, index });
        Ok(())
    }

    pub fn remove_patrimony_item(&mut self, kind: PatrimonyKind, index: usize) -> CoreResult<PatrimonyItem> {
        let items = self.patrimony.items_mut(kind);
        if index >= items.len() {
            return Err(CoreError::InvalidOperation(format!("no {kind} row {index}")));
        }
        let removed = items.remove(index);
        self.errors.retain(|field| {
            !matches!(
                field,
                FieldPath::Beneficiary(BeneficiaryField::PatrimonyItem { kind: k, .. }) if *k == kind
            )
        });
        Ok(removed)
    }

    pub fn patrimony_totals(&self) -> PatrimonyTotals {
        totalize_patrimony(&self.patrimony)
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        patrimony_advisories(&self.patrimony)
    }

    /// Applies every rule, storing and returning the outcome.
    pub fn validate(&mut self, today: NaiveDate) -> &ValidationErrors {
        self.errors = validate_beneficiary(self, today);
        &self.errors
    }

    /// Validates and converts to the create/update body.
    pub fn to_input(&mut self, today: NaiveDate) -> CoreResult<BeneficiaryInput> {
        let errors = self.validate(today);
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors.clone()));
        }
        let text = |value: &str| non_blank(Some(value)).map(str::to_string);
        let mut patrimony = self.patrimony.clone();
        for kind in PatrimonyKind::ALL {
            for item in patrimony.items_mut(kind) {
                item.description = item.description.trim().to_string();
            }
        }
        Ok(BeneficiaryInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            fiscal_code: normalize_fiscal_code(&self.fiscal_code),
            birth_date: self.birth_date,
            birth_place: text(&self.birth_place),
            address: self.address.to_address(),
            notes: text(&self.notes),
            personal_conditions: text(&self.personal_conditions),
            patrimony,
        })
    }
}

pub fn validate_beneficiary(draft: &BeneficiaryDraft, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if draft.first_name.trim().is_empty() {
        errors.push(BeneficiaryField::FirstName, "Il nome è obbligatorio");
    }
    if draft.last_name.trim().is_empty() {
        errors.push(BeneficiaryField::LastName, "Il cognome è obbligatorio");
    }
    if draft.fiscal_code.trim().is_empty() {
        errors.push(BeneficiaryField::FiscalCode, "Il codice fiscale è obbligatorio");
    } else if !is_valid_fiscal_code(&draft.fiscal_code) {
        errors.push(BeneficiaryField::FiscalCode, "Codice fiscale non valido");
    }
    if draft.birth_date.is_some_and(|birth| birth > today) {
        errors.push(
            BeneficiaryField::BirthDate,
            "La data di nascita non può essere nel futuro",
        );
    }

    let cap = draft.address.postal_code.trim();
    if !cap.is_empty() && !is_valid_postal_code(cap) {
        errors.push(BeneficiaryField::PostalCode, "Il CAP deve essere di 5 cifre");
    }
    let province = draft.address.province.trim();
    if !province.is_empty()
        && (province.chars().count() > 2 || !province.chars().all(|c| c.is_ascii_alphabetic()))
    {
        errors.push(
            BeneficiaryField::Province,
            "La provincia deve essere una sigla di 2 lettere",
        );
    }

    for kind in PatrimonyKind::ALL {
        for (index, item) in draft.patrimony.items(kind).iter().enumerate() {
            if item.description.trim().is_empty() {
                errors.push(
                    BeneficiaryField::PatrimonyItem { kind, index },
                    "La descrizione è obbligatoria",
                );
            }
        }
    }
    errors
}
