//! Presentation helpers shared by list, detail and printable views.
//!
//! All helpers are infallible: absent inputs collapse to a neutral rendering.

use ads_domain::{non_blank, Address};
use chrono::{Datelike, NaiveDate};

use crate::time::Clock;

pub const NOT_SPECIFIED: &str = "Non specificato";
pub const MISSING_DATE: &str = "-";

/// Formats currency amounts for presentation.
pub trait CurrencyFormatter: Send + Sync {
    fn format_amount(&self, amount: f64, currency: &str) -> String;
}

/// Formats dates for presentation.
pub trait DateFormatter: Send + Sync {
    fn format_date(&self, date: NaiveDate) -> String;
}

/// it-IT conventions: `1.234,56 €` and `31/12/2024`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItalianFormatter;

impl CurrencyFormatter for ItalianFormatter {
    fn format_amount(&self, amount: f64, currency: &str) -> String {
        let symbol = match currency.trim().to_ascii_uppercase().as_str() {
            "" | "EUR" => "€".to_string(),
            other => other.to_string(),
        };
        format!("{} {}", format_number(amount, 2), symbol)
    }
}

impl DateFormatter for ItalianFormatter {
    fn format_date(&self, date: NaiveDate) -> String {
        date.format("%d/%m/%Y").to_string()
    }
}

/// Groups thousands with `.` and uses `,` as decimal separator.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, dec_part) = match rendered.split_once('.') {
        Some((int_part, dec_part)) => (int_part, Some(dec_part)),
        None => (rendered.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let is_zero = rendered.chars().all(|ch| ch == '0' || ch == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    match dec_part {
        Some(dec_part) => format!("{sign}{grouped},{dec_part}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Euro amount with two decimals; `None` renders as zero.
pub fn format_currency(amount: Option<f64>) -> String {
    ItalianFormatter.format_amount(amount.unwrap_or(0.0), "EUR")
}

/// `dd/mm/yyyy`, or `-` when the date is missing.
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| ItalianFormatter.format_date(date))
        .unwrap_or_else(|| MISSING_DATE.to_string())
}

/// Address rendering with the "Non specificato" sentinel.
pub fn format_address(address: Option<&Address>) -> String {
    format_address_or(address, NOT_SPECIFIED)
}

/// `via, cap citta, (provincia)`, skipping absent parts. The postal code is
/// only shown alongside a city.
pub fn format_address_or(address: Option<&Address>, fallback: &str) -> String {
    let Some(address) = address else {
        return fallback.to_string();
    };

    let mut parts: Vec<String> = Vec::new();
    if let Some(street) = non_blank(address.street.as_deref()) {
        parts.push(street.to_string());
    }
    if let Some(city) = non_blank(address.city.as_deref()) {
        match non_blank(address.postal_code.as_deref()) {
            Some(cap) => parts.push(format!("{cap} {city}")),
            None => parts.push(city.to_string()),
        }
    }
    if let Some(province) = non_blank(address.province.as_deref()) {
        parts.push(format!("({province})"));
    }

    if parts.is_empty() {
        fallback.to_string()
    } else {
        parts.join(", ")
    }
}

/// Completed years between `birth` and `today`. Future birth dates give 0.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

pub fn age(birth: NaiveDate, clock: &dyn Clock) -> u32 {
    age_on(birth, clock.today())
}

/// Age label for list views; `-` when the birth date is unknown.
pub fn format_age(birth: Option<NaiveDate>, clock: &dyn Clock) -> String {
    match birth {
        Some(birth) => format!("{} anni", age(birth, clock)),
        None => MISSING_DATE.to_string(),
    }
}
