//! Printable report model, independent of any output format.
//!
//! [`ReportDocument::build`] turns a report, its beneficiary and the
//! administrator into labelled pages and fixed-height tables. A
//! [`DocumentRenderer`] lays them out.

use ads_domain::{
    non_blank, Administrator, Beneficiary, Declaration, EntryKind, PatrimonyKind, Report,
};
use chrono::Datelike;
use serde::Serialize;

use crate::aggregation::aggregate_for_pdf;
use crate::backend::ImageData;
use crate::format::{format_address, format_currency, format_date, MISSING_DATE};
use crate::time::Clock;
use crate::totals::{sum_amounts, totalize_account, totalize_patrimony};
use crate::CoreResult;

/// Minimum number of body rows in every table.
pub const TABLE_ROWS: usize = 15;

pub const DOCUMENT_TITLE: &str = "RENDICONTO DELL'AMMINISTRAZIONE DI SOSTEGNO";

/// Lays a [`ReportDocument`] out into bytes.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &ReportDocument) -> CoreResult<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub label: String,
    pub note: String,
    pub amount: Option<f64>,
}

impl TableRow {
    fn blank() -> Self {
        Self {
            label: String::new(),
            note: String::new(),
            amount: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.is_empty() && self.note.is_empty() && self.amount.is_none()
    }

    /// Amount column text; empty for padding rows.
    pub fn amount_text(&self) -> String {
        self.amount
            .map(|amount| format_currency(Some(amount)))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentTable {
    pub title: String,
    pub headers: [String; 3],
    /// Content rows followed by blank padding up to [`TABLE_ROWS`].
    pub rows: Vec<TableRow>,
    pub total_label: String,
    pub total: f64,
}

impl DocumentTable {
    fn new(title: impl Into<String>, headers: [&str; 3], rows: Vec<TableRow>, total: f64) -> Self {
        let mut rows = rows;
        while rows.len() < TABLE_ROWS {
            rows.push(TableRow::blank());
        }
        Self {
            title: title.into(),
            headers: headers.map(str::to_string),
            rows,
            total_label: "Totale".to_string(),
            total,
        }
    }

    pub fn content_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|row| !row.is_blank())
    }
}

/// Labelled line of the cover and summary pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: String,
}

fn field(label: &str, value: impl Into<String>) -> Field {
    Field {
        label: label.to_string(),
        value: value.into(),
    }
}

fn or_dash(value: Option<&str>) -> String {
    non_blank(value).unwrap_or(MISSING_DATE).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverPage {
    pub title: String,
    pub court: String,
    pub registry_number: String,
    pub period: String,
    pub beneficiary: Vec<Field>,
    pub administrator: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignatureMark {
    Image(ImageData),
    /// Empty box for a handwritten signature.
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPage {
    pub totals: Vec<Field>,
    pub balance: f64,
    pub declarations: Vec<(String, bool)>,
    pub notes: Option<String>,
    pub place_and_date: String,
    pub signer: String,
    pub signature: SignatureMark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub file_name: String,
    pub cover: CoverPage,
    pub patrimony: Vec<DocumentTable>,
    pub income: DocumentTable,
    pub expenses: DocumentTable,
    pub summary: SummaryPage,
}

impl ReportDocument {
    /// Assembles every page. `signature` is the image recorded with the
    /// report's signature application, used only when there is one.
    pub fn build(
        report: &Report,
        beneficiary: &Beneficiary,
        administrator: &Administrator,
        signature: Option<ImageData>,
        clock: &dyn Clock,
    ) -> Self {
        let general = &report.general;
        let period = format!(
            "dal {} al {}",
            format_date(general.start_date),
            format_date(general.end_date)
        );

        let birth = match (beneficiary.birth_date, non_blank(beneficiary.birth_place.as_deref())) {
            (Some(date), Some(place)) => format!("{place}, {}", format_date(Some(date))),
            (Some(date), None) => format_date(Some(date)),
            (None, Some(place)) => place.to_string(),
            (None, None) => MISSING_DATE.to_string(),
        };

        let cover = CoverPage {
            title: DOCUMENT_TITLE.to_string(),
            court: or_dash(administrator.court.as_deref()),
            registry_number: or_dash(Some(&general.registry_number)),
            period,
            beneficiary: vec![
                field("Beneficiario", beneficiary.full_name()),
                field("Codice fiscale", or_dash(Some(&beneficiary.fiscal_code))),
                field("Luogo e data di nascita", birth),
                field("Residenza", format_address(beneficiary.address.as_ref())),
            ],
            administrator: vec![
                field("Amministratore di sostegno", administrator.full_name()),
                field("Qualifica", or_dash(administrator.qualification.as_deref())),
                field("Codice fiscale", or_dash(administrator.fiscal_code.as_deref())),
                field("Email", administrator.email.clone()),
                field("Telefono", or_dash(administrator.phone.as_deref())),
            ],
        };

        let patrimony = PatrimonyKind::ALL
            .into_iter()
            .map(|kind| {
                let items = beneficiary.patrimony.items(kind);
                let rows = items
                    .iter()
                    .map(|item| TableRow {
                        label: item.description.clone(),
                        note: String::new(),
                        amount: Some(item.value),
                    })
                    .collect();
                DocumentTable::new(
                    kind.to_string(),
                    ["Descrizione", "", "Valore"],
                    rows,
                    sum_amounts(items),
                )
            })
            .collect();

        let account_table = |kind: EntryKind| {
            let items = report.account.items(kind);
            let rows = aggregate_for_pdf(items)
                .into_iter()
                .map(|group| TableRow {
                    label: group.category,
                    note: match group.item_count {
                        1 => "1 voce".to_string(),
                        n => format!("{n} voci"),
                    },
                    amount: Some(group.amount),
                })
                .collect();
            DocumentTable::new(
                kind.to_string(),
                ["Categoria", "Voci", "Importo"],
                rows,
                sum_amounts(items),
            )
        };
        let income = account_table(EntryKind::Income);
        let expenses = account_table(EntryKind::Expense);

        let patrimony_totals = totalize_patrimony(&beneficiary.patrimony);
        let economic = totalize_account(&report.account.income, &report.account.expenses);
        let signing = &report.signing;
        let place = non_blank(signing.place.as_deref()).unwrap_or("");
        let date = signing
            .date
            .map(|date| format_date(Some(date)))
            .unwrap_or_else(|| format_date(Some(clock.today())));
        let place_and_date = if place.is_empty() {
            date
        } else {
            format!("{place}, {date}")
        };
        let signature = match (&signing.signature, signature) {
            (Some(_), Some(image)) => SignatureMark::Image(image),
            _ => SignatureMark::Blank,
        };
        let signer = signing
            .signature
            .as_ref()
            .map(|applied| applied.administrator_full_name.clone())
            .unwrap_or_else(|| administrator.full_name());

        let summary = SummaryPage {
            totals: vec![
                field("Totale patrimonio", format_currency(Some(patrimony_totals.total))),
                field("Totale entrate", format_currency(Some(economic.total_income))),
                field("Totale uscite", format_currency(Some(economic.total_expense))),
                field("Saldo del periodo", format_currency(Some(economic.balance))),
            ],
            balance: economic.balance,
            declarations: Declaration::ALL
                .into_iter()
                .map(|d| (d.to_string(), signing.declarations.get(d)))
                .collect(),
            notes: non_blank(signing.notes.as_deref()).map(str::to_string),
            place_and_date,
            signer,
            signature,
        };

        Self {
            file_name: document_file_name(&beneficiary.last_name, report, clock),
            cover,
            patrimony,
            income,
            expenses,
            summary,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &DocumentTable> {
        self.patrimony
            .iter()
            .chain(std::iter::once(&self.income))
            .chain(std::iter::once(&self.expenses))
    }
}

/// `Rendiconto_<surname>_<year>.pdf`. The year comes from the end date, then
/// the start date, then today.
pub fn document_file_name(last_name: &str, report: &Report, clock: &dyn Clock) -> String {
    let year = report
        .reference_year()
        .unwrap_or_else(|| clock.today().year());
    format!("Rendiconto_{}_{year}.pdf", sanitize_file_component(last_name))
}

/// Keeps letters, digits, `-` and `_`; whitespace runs become `_`.
pub fn sanitize_file_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_gap = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            if pending_gap && !out.is_empty() {
                out.push('_');
            }
            pending_gap = false;
            out.push(ch);
        } else if ch.is_whitespace() || ch == '\'' {
            pending_gap = true;
        }
    }
    if out.is_empty() {
        "Beneficiario".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_administrator;
    use crate::time::FixedClock;
    use ads_domain::{
        BeneficiaryRef, EconomicItem, GeneralData, PatrimonyItem, SignatureApplication,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn beneficiary() -> Beneficiary {
        let mut b = Beneficiary::new("b1", "Mario", "D'Angelo Rossi");
        b.fiscal_code = "DNGMRA80A01F205X".into();
        b.patrimony
            .real_estate
            .push(PatrimonyItem::new("Appartamento", 120_000.0));
        b.patrimony.financial.push(PatrimonyItem::new("Conto", 5_000.0));
        b
    }

    fn report() -> Report {
        let mut report = Report {
            id: "r1".into(),
            beneficiary: BeneficiaryRef::Id("b1".into()),
            general: GeneralData {
                start_date: Some(date(2023, 1, 1)),
                end_date: Some(date(2023, 12, 31)),
                registry_number: "RG 55/2023".into(),
            },
            account: Default::default(),
            signing: Default::default(),
            state: Default::default(),
            created_at: None,
            updated_at: None,
        };
        report
            .account
            .income
            .push(EconomicItem::new("Pensione", "INPS", 1000.0));
        report
            .account
            .expenses
            .push(EconomicItem::new("Farmaci", "", 300.0));
        report
            .account
            .expenses
            .push(EconomicItem::new("Farmaci", "", 50.0));
        report
    }

    fn clock() -> FixedClock {
        FixedClock::on(date(2025, 3, 10))
    }

    #[test]
    fn tables_are_padded_and_totalled() {
        let doc = ReportDocument::build(&report(), &beneficiary(), &test_administrator(), None, &clock());
        assert_eq!(doc.tables().count(), 5);
        for table in doc.tables() {
            assert_eq!(table.rows.len(), TABLE_ROWS);
        }
        assert_eq!(doc.patrimony[0].total, 120_000.0);
        assert_eq!(doc.patrimony[1].content_rows().count(), 0);
        let expenses: Vec<&TableRow> = doc.expenses.content_rows().collect();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].label, "Farmaci");
        assert_eq!(expenses[0].note, "2 voci");
        assert_eq!(doc.expenses.total, 350.0);
        assert_eq!(doc.summary.balance, 650.0);
        assert_eq!(doc.summary.totals[0].value, "125.000,00 €");
    }

    #[test]
    fn long_tables_are_not_truncated() {
        let mut b = beneficiary();
        for n in 0..20 {
            b.patrimony
                .movable_goods
                .push(PatrimonyItem::new(format!("Bene {n}"), 1.0));
        }
        let doc = ReportDocument::build(&report(), &b, &test_administrator(), None, &clock());
        assert_eq!(doc.patrimony[1].rows.len(), 20);
    }

    #[test]
    fn file_name_uses_sanitized_surname_and_reference_year() {
        let doc = ReportDocument::build(&report(), &beneficiary(), &test_administrator(), None, &clock());
        assert_eq!(doc.file_name, "Rendiconto_D_Angelo_Rossi_2023.pdf");

        let mut undated = report();
        undated.general.end_date = None;
        assert_eq!(
            document_file_name("Rossi", &undated, &clock()),
            "Rendiconto_Rossi_2023.pdf"
        );
        undated.general.start_date = None;
        assert_eq!(
            document_file_name("  / ", &undated, &clock()),
            "Rendiconto_Beneficiario_2025.pdf"
        );
    }

    #[test]
    fn signature_image_only_when_applied() {
        let image = ImageData {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".into(),
            file_name: "firma.png".into(),
        };
        let unsigned = ReportDocument::build(
            &report(),
            &beneficiary(),
            &test_administrator(),
            Some(image.clone()),
            &clock(),
        );
        assert_eq!(unsigned.summary.signature, SignatureMark::Blank);
        assert_eq!(unsigned.summary.place_and_date, "10/03/2025");

        let mut signed = report();
        signed.signing.place = Some("Milano".into());
        signed.signing.date = Some(date(2024, 1, 15));
        signed.signing.signature = Some(SignatureApplication {
            image: "/uploads/firma.png".into(),
            applied_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            administrator_full_name: "Laura Verdi".into(),
        });
        let doc = ReportDocument::build(&signed, &beneficiary(), &test_administrator(), Some(image), &clock());
        assert!(matches!(doc.summary.signature, SignatureMark::Image(_)));
        assert_eq!(doc.summary.place_and_date, "Milano, 15/01/2024");
        assert_eq!(doc.summary.signer, "Laura Verdi");
    }
}
