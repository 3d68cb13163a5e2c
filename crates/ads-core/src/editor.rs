//! Three-step report editor over a single shared draft.
//!
//! The editor never persists on its own: `save` is the only operation that
//! reaches the backend, and it runs the declaration gate and the full
//! cross-step validation first.

use std::cmp::Ordering;

use ads_domain::{
    finite_or_zero, non_blank, Amounted, Beneficiary, Declaration, Described, EconomicAccount,
    EconomicItem, EntityId, EntryKind, GeneralData, Report, SigningBlock,
};
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregation::{aggregate_by_category, Categorized, CategoryGroup};
use crate::backend::{ReportPayload, SaveKind};
use crate::navigation::Route;
use crate::session::ApiClient;
use crate::totals::{
    balance_advisories, patrimony_advisories, totalize_account, totalize_patrimony, Advisory,
    EconomicTotals, PatrimonyTotals,
};
use crate::validation::{validate_report, FieldPath, ItemField, ReportField, ValidationErrors};
use crate::{CoreError, CoreResult};

/// Stable identity of a draft line item, independent of its position.
pub type ItemKey = Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct DraftItem {
    pub key: ItemKey,
    pub category: String,
    pub description: String,
    pub amount: f64,
}

impl DraftItem {
    pub fn new(category: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self {
            key: Uuid::new_v4(),
            category: category.into(),
            description: description.into(),
            amount,
        }
    }

    fn blank() -> Self {
        Self::new("", "", 0.0)
    }

    fn to_economic(&self) -> EconomicItem {
        EconomicItem::new(
            self.category.trim(),
            self.description.trim(),
            finite_or_zero(self.amount),
        )
    }
}

impl From<&EconomicItem> for DraftItem {
    fn from(value: &EconomicItem) -> Self {
        Self::new(value.category.clone(), value.description.clone(), value.amount)
    }
}

impl Amounted for DraftItem {
    fn amount(&self) -> f64 {
        finite_or_zero(self.amount)
    }
}

impl Described for DraftItem {
    fn description(&self) -> Option<&str> {
        non_blank(Some(&self.description))
    }
}

impl Categorized for DraftItem {
    fn category(&self) -> Option<&str> {
        non_blank(Some(&self.category))
    }
}

/// Everything the editor collects before a save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDraft {
    pub beneficiary_id: Option<EntityId>,
    pub general: GeneralData,
    pub income: Vec<DraftItem>,
    pub expenses: Vec<DraftItem>,
    pub signing: SigningBlock,
}

impl ReportDraft {
    pub fn from_report(report: &Report) -> Self {
        Self {
            beneficiary_id: non_blank(Some(report.beneficiary_id())).map(str::to_string),
            general: report.general.clone(),
            income: report.account.income.iter().map(DraftItem::from).collect(),
            expenses: report.account.expenses.iter().map(DraftItem::from).collect(),
            signing: report.signing.clone(),
        }
    }

    pub fn items(&self, kind: EntryKind) -> &[DraftItem] {
        match kind {
            EntryKind::Income => &self.income,
            EntryKind::Expense => &self.expenses,
        }
    }

    pub fn items_mut(&mut self, kind: EntryKind) -> &mut Vec<DraftItem> {
        match kind {
            EntryKind::Income => &mut self.income,
            EntryKind::Expense => &mut self.expenses,
        }
    }

    pub fn account(&self) -> EconomicAccount {
        EconomicAccount {
            income: self.income.iter().map(DraftItem::to_economic).collect(),
            expenses: self.expenses.iter().map(DraftItem::to_economic).collect(),
        }
    }

    /// Full body for create/update, with the lifecycle state implied by `kind`.
    pub fn to_payload(&self, kind: SaveKind) -> CoreResult<ReportPayload> {
        let beneficiary_id = self
            .beneficiary_id
            .clone()
            .ok_or_else(|| CoreError::InvalidOperation("no beneficiary selected".into()))?;
        let mut general = self.general.clone();
        general.registry_number = general.registry_number.trim().to_string();
        Ok(ReportPayload {
            beneficiary_id,
            general,
            account: self.account(),
            signing: self.signing.clone(),
            state: kind.target_state(),
            save_kind: kind,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditorStep {
    GeneralData,
    EconomicAccount,
    Signing,
}

impl EditorStep {
    pub const ALL: [EditorStep; 3] = [
        EditorStep::GeneralData,
        EditorStep::EconomicAccount,
        EditorStep::Signing,
    ];

    pub fn index(self) -> usize {
        match self {
            EditorStep::GeneralData => 0,
            EditorStep::EconomicAccount => 1,
            EditorStep::Signing => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            EditorStep::GeneralData => "Dati generali",
            EditorStep::EconomicAccount => "Conto economico",
            EditorStep::Signing => "Dichiarazioni e firma",
        }
    }
}

impl ReportField {
    /// Step of the editor where the field is edited.
    pub fn step(&self) -> EditorStep {
        match self {
            ReportField::Beneficiary
            | ReportField::StartDate
            | ReportField::EndDate
            | ReportField::RegistryNumber => EditorStep::GeneralData,
            ReportField::Item { .. } => EditorStep::EconomicAccount,
            ReportField::Declaration(_) => EditorStep::Signing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Editing(EditorStep),
    Submitted(SaveKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit { report_id: EntityId },
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub report: Report,
    pub follow_up: Route,
    /// Set after a pdf-export save; generation stays a separate action.
    pub offer_pdf_export: bool,
}

#[derive(Debug, Clone)]
pub struct ReportEditor {
    mode: EditorMode,
    state: EditorState,
    draft: ReportDraft,
    errors: ValidationErrors,
    beneficiary: Option<Beneficiary>,
}

impl Default for ReportEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEditor {
    /// Editor for a brand new report, positioned on the first step.
    pub fn new() -> Self {
        Self {
            mode: EditorMode::Create,
            state: EditorState::Editing(EditorStep::GeneralData),
            draft: ReportDraft::default(),
            errors: ValidationErrors::new(),
            beneficiary: None,
        }
    }

    /// Editor preloaded with an existing report. Sent reports are refused.
    pub fn edit(report: &Report, beneficiary: Option<Beneficiary>) -> CoreResult<Self> {
        if !report.is_editable() {
            return Err(CoreError::ReportLocked(report.id.clone()));
        }
        let beneficiary = beneficiary.filter(|b| b.id == report.beneficiary_id());
        Ok(Self {
            mode: EditorMode::Edit {
                report_id: report.id.clone(),
            },
            state: EditorState::Editing(EditorStep::GeneralData),
            draft: ReportDraft::from_report(report),
            errors: ValidationErrors::new(),
            beneficiary,
        })
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Current step, or `None` once submitted.
    pub fn step(&self) -> Option<EditorStep> {
        match self.state {
            EditorState::Editing(step) => Some(step),
            EditorState::Submitted(_) => None,
        }
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn beneficiary(&self) -> Option<&Beneficiary> {
        self.beneficiary.as_ref()
    }

    fn current_step(&self) -> CoreResult<EditorStep> {
        self.step()
            .ok_or_else(|| CoreError::InvalidOperation("report already submitted".into()))
    }

    fn touch(&mut self, field: ReportField) -> CoreResult<()> {
        self.current_step()?;
        self.errors.remove(field);
        Ok(())
    }

    pub fn next(&mut self) -> CoreResult<EditorStep> {
        let step = self.current_step()?;
        let target = EditorStep::from_index(step.index() + 1).unwrap_or(step);
        self.state = EditorState::Editing(target);
        debug!(step = target.index(), "editor moved forward");
        Ok(target)
    }

    pub fn previous(&mut self) -> CoreResult<EditorStep> {
        let step = self.current_step()?;
        let target = step
            .index()
            .checked_sub(1)
            .and_then(EditorStep::from_index)
            .unwrap_or(step);
        self.state = EditorState::Editing(target);
        debug!(step = target.index(), "editor moved back");
        Ok(target)
    }

    pub fn jump_to_step(&mut self, index: usize) -> CoreResult<EditorStep> {
        self.current_step()?;
        let target = EditorStep::from_index(index)
            .ok_or_else(|| CoreError::InvalidOperation(format!("no editor step {index}")))?;
        self.state = EditorState::Editing(target);
        Ok(target)
    }

    /// Attaches the report to `beneficiary`. Inactive beneficiaries cannot be
    /// chosen, except the one an existing report already belongs to.
    pub fn select_beneficiary(&mut self, beneficiary: Beneficiary) -> CoreResult<()> {
        let already_attached = self.draft.beneficiary_id.as_deref() == Some(beneficiary.id.as_str());
        if !beneficiary.is_selectable() && !already_attached {
            return Err(CoreError::InvalidOperation(format!(
                "beneficiary {} is inactive",
                beneficiary.full_name()
            )));
        }
        self.touch(ReportField::Beneficiary)?;
        self.draft.beneficiary_id = Some(beneficiary.id.clone());
        self.beneficiary = Some(beneficiary);
        Ok(())
    }

    pub fn clear_beneficiary(&mut self) -> CoreResult<()> {
        self.touch(ReportField::Beneficiary)?;
        self.draft.beneficiary_id = None;
        self.beneficiary = None;
        Ok(())
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) -> CoreResult<()> {
        self.touch(ReportField::StartDate)?;
        self.draft.general.start_date = date;
        Ok(())
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) -> CoreResult<()> {
        self.touch(ReportField::EndDate)?;
        self.draft.general.end_date = date;
        Ok(())
    }

    pub fn set_registry_number(&mut self, value: impl Into<String>) -> CoreResult<()> {
        self.touch(ReportField::RegistryNumber)?;
        self.draft.general.registry_number = value.into();
        Ok(())
    }

    /// Appends an empty line item and returns its key.
    pub fn add_item(&mut self, kind: EntryKind) -> CoreResult<ItemKey> {
        self.current_step()?;
        let item = DraftItem::blank();
        let key = item.key;
        self.draft.items_mut(kind).push(item);
        Ok(key)
    }

    pub fn add_item_with(
        &mut self,
        kind: EntryKind,
        category: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
    ) -> CoreResult<ItemKey> {
        self.current_step()?;
        let item = DraftItem::new(category, description, amount);
        let key = item.key;
        self.draft.items_mut(kind).push(item);
        Ok(key)
    }

    pub fn remove_item(&mut self, kind: EntryKind, key: ItemKey) -> CoreResult<DraftItem> {
        self.current_step()?;
        let position = self.position(kind, key)?;
        let removed = self.draft.items_mut(kind).remove(position);
        // Rows after the removed one move up by one.
        self.errors.remap(|path| match path {
            FieldPath::Report(ReportField::Item { kind: k, index, field }) if k == kind => {
                match index.cmp(&position) {
                    Ordering::Less => Some(path),
                    Ordering::Equal => None,
                    Ordering::Greater => Some(FieldPath::Report(ReportField::Item {
                        kind,
                        index: index - 1,
                        field,
                    })),
                }
            }
            other => Some(other),
        });
        Ok(removed)
    }

    pub fn set_item_category(
        &mut self,
        kind: EntryKind,
        key: ItemKey,
        value: impl Into<String>,
    ) -> CoreResult<()> {
        let item = self.item_for_update(kind, key, ItemField::Category)?;
        item.category = value.into();
        Ok(())
    }

    pub fn set_item_description(
        &mut self,
        kind: EntryKind,
        key: ItemKey,
        value: impl Into<String>,
    ) -> CoreResult<()> {
        let item = self.item_for_update(kind, key, ItemField::Description)?;
        item.description = value.into();
        Ok(())
    }

    pub fn set_item_amount(&mut self, kind: EntryKind, key: ItemKey, amount: f64) -> CoreResult<()> {
        let item = self.item_for_update(kind, key, ItemField::Amount)?;
        item.amount = amount;
        Ok(())
    }

    fn position(&self, kind: EntryKind, key: ItemKey) -> CoreResult<usize> {
        self.draft
            .items(kind)
            .iter()
            .position(|item| item.key == key)
            .ok_or_else(|| CoreError::InvalidOperation(format!("unknown {kind} item {key}")))
    }

    fn item_for_update(
        &mut self,
        kind: EntryKind,
        key: ItemKey,
        field: ItemField,
    ) -> CoreResult<&mut DraftItem> {
        let index = self.position(kind, key)?;
        self.touch(ReportField::Item { kind, index, field })?;
        Ok(&mut self.draft.items_mut(kind)[index])
    }

    pub fn set_declaration(&mut self, declaration: Declaration, value: bool) -> CoreResult<()> {
        self.touch(ReportField::Declaration(declaration))?;
        self.draft.signing.declarations.set(declaration, value);
        Ok(())
    }

    pub fn set_place(&mut self, place: Option<String>) -> CoreResult<()> {
        self.current_step()?;
        self.draft.signing.place = place.filter(|p| !p.trim().is_empty());
        Ok(())
    }

    pub fn set_signing_date(&mut self, date: Option<NaiveDate>) -> CoreResult<()> {
        self.current_step()?;
        self.draft.signing.date = date;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> CoreResult<()> {
        self.current_step()?;
        self.draft.signing.notes = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    /// True only while every declaration is confirmed.
    pub fn save_options_available(&self) -> bool {
        self.draft.signing.declarations.all_confirmed()
    }

    /// Runs validation without saving and records the outcome.
    pub fn validate(&mut self) -> bool {
        self.errors = validate_report(&self.draft);
        self.errors.is_empty()
    }

    /// Submits the draft. On success the editor becomes `Submitted(kind)`.
    pub fn save(&mut self, kind: SaveKind, api: &ApiClient) -> CoreResult<SaveOutcome> {
        self.current_step()?;
        if !self.save_options_available() {
            return Err(CoreError::DeclarationsIncomplete);
        }

        let errors = validate_report(&self.draft);
        if !errors.is_empty() {
            if let Some(step) = errors.report_fields().map(|field| field.step()).min() {
                self.state = EditorState::Editing(step);
            }
            debug!(errors = errors.len(), "report draft rejected by validation");
            self.errors = errors.clone();
            return Err(CoreError::Validation(errors));
        }
        self.errors.clear();

        let payload = self.draft.to_payload(kind)?;
        let result = match &self.mode {
            EditorMode::Create => api.call(|backend, ctx| backend.create_report(ctx, &payload)),
            EditorMode::Edit { report_id } => {
                api.call(|backend, ctx| backend.update_report(ctx, report_id, &payload))
            }
        };
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, ?kind, "report save failed, draft kept");
                return Err(err);
            }
        };

        info!(report = %report.id, ?kind, state = %report.state, "report saved");
        self.mode = EditorMode::Edit {
            report_id: report.id.clone(),
        };
        self.state = EditorState::Submitted(kind);
        let follow_up = match kind {
            SaveKind::Draft => Route::Reports,
            SaveKind::Final | SaveKind::PdfExport => Route::ReportDetail(report.id.clone()),
        };
        Ok(SaveOutcome {
            report,
            follow_up,
            offer_pdf_export: kind == SaveKind::PdfExport,
        })
    }

    pub fn totals(&self) -> EconomicTotals {
        totalize_account(&self.draft.income, &self.draft.expenses)
    }

    pub fn income_groups(&self) -> Vec<CategoryGroup> {
        aggregate_by_category(&self.draft.income)
    }

    pub fn expense_groups(&self) -> Vec<CategoryGroup> {
        aggregate_by_category(&self.draft.expenses)
    }

    /// Patrimony of the selected beneficiary, when one is loaded.
    pub fn patrimony_totals(&self) -> Option<PatrimonyTotals> {
        self.beneficiary
            .as_ref()
            .map(|beneficiary| totalize_patrimony(&beneficiary.patrimony))
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        let mut advisories = balance_advisories(&self.totals());
        if let Some(beneficiary) = &self.beneficiary {
            advisories.extend(patrimony_advisories(&beneficiary.patrimony));
        }
        advisories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_client, FakeBackend};
    use ads_domain::ReportState;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn beneficiary(backend: &FakeBackend) -> Beneficiary {
        let mut b = Beneficiary::new("ben-rossi", "Mario", "Rossi");
        b.fiscal_code = "RSSMRA80A01F205X".into();
        backend.insert_beneficiary(b.clone());
        b
    }

    fn confirm_all(editor: &mut ReportEditor) {
        for declaration in Declaration::ALL {
            editor.set_declaration(declaration, true).unwrap();
        }
    }

    fn filled_editor(backend: &FakeBackend) -> ReportEditor {
        let mut editor = ReportEditor::new();
        editor.select_beneficiary(beneficiary(backend)).unwrap();
        editor.set_start_date(Some(date(2024, 1, 1))).unwrap();
        editor.set_end_date(Some(date(2024, 12, 31))).unwrap();
        editor.set_registry_number("RG 123/2024").unwrap();
        editor
            .add_item_with(EntryKind::Income, "Pensione", "INPS", 1000.0)
            .unwrap();
        editor
            .add_item_with(EntryKind::Expense, "Farmaci", "Farmacia", 300.0)
            .unwrap();
        editor
            .add_item_with(EntryKind::Expense, "Farmaci", "Ticket", 50.0)
            .unwrap();
        confirm_all(&mut editor);
        editor
    }

    #[test]
    fn navigation_saturates_at_both_ends() {
        let mut editor = ReportEditor::new();
        assert_eq!(editor.previous().unwrap(), EditorStep::GeneralData);
        assert_eq!(editor.next().unwrap(), EditorStep::EconomicAccount);
        assert_eq!(editor.next().unwrap(), EditorStep::Signing);
        assert_eq!(editor.next().unwrap(), EditorStep::Signing);
        assert_eq!(editor.jump_to_step(0).unwrap(), EditorStep::GeneralData);
        assert!(matches!(
            editor.jump_to_step(3),
            Err(CoreError::InvalidOperation(_))
        ));
        assert_eq!(editor.step(), Some(EditorStep::GeneralData));
    }

    #[test]
    fn declaration_gate_opens_and_closes() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        assert!(editor.save_options_available());

        editor
            .set_declaration(Declaration::DataProcessingConsent, false)
            .unwrap();
        assert!(!editor.save_options_available());
        assert!(matches!(
            editor.save(SaveKind::Final, &api),
            Err(CoreError::DeclarationsIncomplete)
        ));
        assert_eq!(backend.call_count("create_report"), 0);
    }

    #[test]
    fn gate_is_checked_before_validation() {
        let (_backend, api) = signed_in_client();
        let mut editor = ReportEditor::new();
        editor.jump_to_step(2).unwrap();
        assert!(matches!(
            editor.save(SaveKind::Draft, &api),
            Err(CoreError::DeclarationsIncomplete)
        ));
        assert!(editor.errors().is_empty());
        assert_eq!(editor.step(), Some(EditorStep::Signing));
    }

    #[test]
    fn validation_failure_jumps_to_first_failing_step() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        let key = editor.add_item(EntryKind::Income).unwrap();
        editor.jump_to_step(2).unwrap();

        let err = editor.save(SaveKind::Final, &api).unwrap_err();
        let errors = err.validation_errors().expect("validation error");
        let field = ReportField::Item {
            kind: EntryKind::Income,
            index: 1,
            field: ItemField::Category,
        };
        assert!(errors.contains(field));
        assert_eq!(editor.step(), Some(EditorStep::EconomicAccount));

        editor.set_registry_number("").unwrap();
        let _ = editor.save(SaveKind::Final, &api);
        assert_eq!(editor.step(), Some(EditorStep::GeneralData));

        editor
            .set_item_category(EntryKind::Income, key, "Rendite")
            .unwrap();
        assert!(!editor.errors().contains(field));
    }

    #[test]
    fn end_date_must_follow_start_date() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        editor.set_end_date(Some(date(2024, 1, 1))).unwrap();
        let err = editor.save(SaveKind::Draft, &api).unwrap_err();
        assert!(err
            .validation_errors()
            .unwrap()
            .contains(ReportField::EndDate));
    }

    #[test]
    fn draft_save_creates_and_returns_to_list() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        let outcome = editor.save(SaveKind::Draft, &api).unwrap();
        assert_eq!(outcome.follow_up, Route::Reports);
        assert!(!outcome.offer_pdf_export);
        assert_eq!(outcome.report.state, ReportState::Draft);
        assert_eq!(editor.state(), EditorState::Submitted(SaveKind::Draft));

        let stored = backend.reports();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].account.expenses.len(), 2);
        assert_eq!(stored[0].general.registry_number, "RG 123/2024");
    }

    #[test]
    fn final_and_pdf_saves_complete_the_report() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        let outcome = editor.save(SaveKind::PdfExport, &api).unwrap();
        assert_eq!(outcome.report.state, ReportState::Completed);
        assert_eq!(outcome.follow_up, Route::ReportDetail(outcome.report.id.clone()));
        assert!(outcome.offer_pdf_export);

        let report = backend.reports().remove(0);
        let mut again = ReportEditor::edit(&report, None).unwrap();
        let outcome = again.save(SaveKind::Final, &api).unwrap();
        assert_eq!(outcome.follow_up, Route::ReportDetail(report.id.clone()));
        assert_eq!(backend.call_count("update_report"), 1);
        assert_eq!(backend.reports().len(), 1);
    }

    #[test]
    fn backend_failure_keeps_draft_for_retry() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        editor.jump_to_step(2).unwrap();
        backend.fail_next(CoreError::Network("connection reset".into()));

        assert!(matches!(
            editor.save(SaveKind::Final, &api),
            Err(CoreError::Network(_))
        ));
        assert_eq!(editor.state(), EditorState::Editing(EditorStep::Signing));
        assert_eq!(editor.draft().expenses.len(), 2);
        assert!(editor.save(SaveKind::Final, &api).is_ok());
    }

    #[test]
    fn submitted_editor_refuses_further_edits() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        editor.save(SaveKind::Draft, &api).unwrap();
        assert!(editor.set_registry_number("x").is_err());
        assert!(editor.next().is_err());
    }

    #[test]
    fn sent_reports_cannot_be_edited() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        let mut report = editor.save(SaveKind::Final, &api).unwrap().report;
        report.state = ReportState::Sent;
        assert!(matches!(
            ReportEditor::edit(&report, None),
            Err(CoreError::ReportLocked(_))
        ));
    }

    #[test]
    fn inactive_beneficiary_is_refused_for_new_reports() {
        let mut inactive = Beneficiary::new("ben-2", "Anna", "Bianchi");
        inactive.active = false;
        let mut editor = ReportEditor::new();
        assert!(editor.select_beneficiary(inactive).is_err());
        assert!(editor.draft().beneficiary_id.is_none());
    }

    #[test]
    fn removing_an_item_shifts_the_errors_of_later_rows() {
        let (backend, api) = signed_in_client();
        let mut editor = filled_editor(&backend);
        let first = editor.add_item(EntryKind::Expense).unwrap();
        let second = editor.add_item(EntryKind::Expense).unwrap();
        let _ = editor.save(SaveKind::Draft, &api);
        let category = |index| ReportField::Item {
            kind: EntryKind::Expense,
            index,
            field: ItemField::Category,
        };
        assert!(editor.errors().contains(category(2)));
        assert!(editor.errors().contains(category(3)));

        editor.remove_item(EntryKind::Expense, first).unwrap();
        assert!(editor.errors().contains(category(2)));
        assert!(!editor.errors().contains(category(3)));
        assert!(!editor.errors().contains(category(1)));

        editor.remove_item(EntryKind::Expense, second).unwrap();
        assert!(editor.errors().is_empty());
        assert!(editor.save(SaveKind::Draft, &api).is_ok());
    }

    #[test]
    fn derived_values_follow_the_draft() {
        let backend = FakeBackend::new();
        let mut editor = filled_editor(&backend);
        let totals = editor.totals();
        assert_eq!(totals.total_income, 1000.0);
        assert_eq!(totals.total_expense, 350.0);
        assert_eq!(totals.balance, 650.0);

        let groups = editor.expense_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, "Farmaci");
        assert_eq!(groups[0].amount, 350.0);
        assert_eq!(groups[0].item_count, 2);
        assert_eq!(editor.patrimony_totals().map(|t| t.total), Some(0.0));
        assert!(editor.advisories().is_empty());

        editor
            .add_item_with(EntryKind::Expense, "Affitto", "Casa", 2000.0)
            .unwrap();
        assert_eq!(editor.advisories(), vec![Advisory::NegativeBalance(-1350.0)]);
    }
}
