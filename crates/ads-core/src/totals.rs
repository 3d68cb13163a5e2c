//! Patrimony and economic-account totals, plus the advisory warnings derived
//! from them.

use std::fmt;

use ads_domain::{Amounted, Patrimony, PatrimonyKind};
use serde::Serialize;

use crate::format::format_currency;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PatrimonyTotals {
    pub real_estate: f64,
    pub movable_goods: f64,
    pub financial: f64,
    pub total: f64,
}

impl PatrimonyTotals {
    pub fn subtotal(&self, kind: PatrimonyKind) -> f64 {
        match kind {
            PatrimonyKind::RealEstate => self.real_estate,
            PatrimonyKind::MovableGoods => self.movable_goods,
            PatrimonyKind::Financial => self.financial,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EconomicTotals {
    #[serde(rename = "totaleEntrate")]
    pub total_income: f64,
    #[serde(rename = "totaleUscite")]
    pub total_expense: f64,
    #[serde(rename = "saldo")]
    pub balance: f64,
}

impl EconomicTotals {
    pub fn is_negative(&self) -> bool {
        self.balance < 0.0
    }
}

pub fn sum_amounts<I: Amounted>(items: &[I]) -> f64 {
    items.iter().map(Amounted::amount).sum()
}

/// Sums each asset list and the grand total. Negative values are kept.
pub fn totalize_patrimony(patrimony: &Patrimony) -> PatrimonyTotals {
    let real_estate = sum_amounts(&patrimony.real_estate);
    let movable_goods = sum_amounts(&patrimony.movable_goods);
    let financial = sum_amounts(&patrimony.financial);
    PatrimonyTotals {
        real_estate,
        movable_goods,
        financial,
        total: real_estate + movable_goods + financial,
    }
}

/// Income, expense and `balance = income - expense`.
pub fn totalize_account<I: Amounted, E: Amounted>(income: &[I], expenses: &[E]) -> EconomicTotals {
    let total_income = sum_amounts(income);
    let total_expense = sum_amounts(expenses);
    EconomicTotals {
        total_income,
        total_expense,
        balance: total_income - total_expense,
    }
}

/// Non-blocking warnings shown next to totals. Never a reason to refuse a save.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    NegativeBalance(f64),
    NegativePatrimonyValue { kind: PatrimonyKind, index: usize },
    NegativePatrimonyTotal(f64),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::NegativeBalance(balance) => write!(
                f,
                "Attenzione: il saldo del periodo è negativo ({})",
                format_currency(Some(*balance))
            ),
            Advisory::NegativePatrimonyValue { kind, index } => write!(
                f,
                "Attenzione: valore negativo in {} (riga {})",
                kind,
                index + 1
            ),
            Advisory::NegativePatrimonyTotal(total) => write!(
                f,
                "Attenzione: il patrimonio totale è negativo ({})",
                format_currency(Some(*total))
            ),
        }
    }
}

pub fn patrimony_advisories(patrimony: &Patrimony) -> Vec<Advisory> {
    let mut advisories = Vec::new();
    for kind in PatrimonyKind::ALL {
        for (index, item) in patrimony.items(kind).iter().enumerate() {
            if item.amount() < 0.0 {
                advisories.push(Advisory::NegativePatrimonyValue { kind, index });
            }
        }
    }
    let totals = totalize_patrimony(patrimony);
    if totals.total < 0.0 {
        advisories.push(Advisory::NegativePatrimonyTotal(totals.total));
    }
    advisories
}

pub fn balance_advisories(totals: &EconomicTotals) -> Vec<Advisory> {
    if totals.is_negative() {
        vec![Advisory::NegativeBalance(totals.balance)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ads_domain::{EconomicItem, PatrimonyItem};
    use proptest::prelude::*;

    #[test]
    fn patrimony_totals_sum_each_list() {
        let patrimony = Patrimony {
            real_estate: vec![PatrimonyItem::new("Casa", 100_000.0)],
            movable_goods: vec![
                PatrimonyItem::new("Auto", 5_000.0),
                PatrimonyItem::new("Arredi", f64::NAN),
            ],
            financial: vec![PatrimonyItem::new("Conto", 2_500.5)],
        };
        let totals = totalize_patrimony(&patrimony);
        assert_eq!(totals.real_estate, 100_000.0);
        assert_eq!(totals.movable_goods, 5_000.0);
        assert_eq!(totals.financial, 2_500.5);
        assert_eq!(totals.total, 107_500.5);
        assert_eq!(totals.subtotal(PatrimonyKind::MovableGoods), 5_000.0);
    }

    #[test]
    fn negative_values_are_advisories_not_errors() {
        let patrimony = Patrimony {
            financial: vec![PatrimonyItem::new("Scoperto", -300.0)],
            ..Patrimony::default()
        };
        let totals = totalize_patrimony(&patrimony);
        assert_eq!(totals.total, -300.0);
        let advisories = patrimony_advisories(&patrimony);
        assert_eq!(
            advisories,
            vec![
                Advisory::NegativePatrimonyValue {
                    kind: PatrimonyKind::Financial,
                    index: 0
                },
                Advisory::NegativePatrimonyTotal(-300.0),
            ]
        );
    }

    #[test]
    fn balance_is_income_minus_expense() {
        let income = vec![EconomicItem::new("Pensione", "", 1000.0)];
        let expenses = vec![
            EconomicItem::new("Farmaci", "", 300.0),
            EconomicItem::new("Farmaci", "", 50.0),
        ];
        let totals = totalize_account(&income, &expenses);
        assert_eq!(totals.total_income, 1000.0);
        assert_eq!(totals.total_expense, 350.0);
        assert_eq!(totals.balance, 650.0);
        assert!(balance_advisories(&totals).is_empty());
    }

    #[test]
    fn empty_sides_total_zero() {
        let none: Vec<EconomicItem> = Vec::new();
        let totals = totalize_account(&none, &none);
        assert_eq!(totals, EconomicTotals::default());

        let expenses = vec![EconomicItem::new("Affitto", "", 500.0)];
        let totals = totalize_account(&none, &expenses);
        assert_eq!(totals.balance, -500.0);
        let advisories = balance_advisories(&totals);
        assert_eq!(advisories, vec![Advisory::NegativeBalance(-500.0)]);
        assert!(advisories[0].to_string().contains("-500,00 €"));
    }

    proptest! {
        #[test]
        fn balance_identity_holds(
            income in prop::collection::vec(0u32..100_000, 0..20),
            expenses in prop::collection::vec(0u32..100_000, 0..20),
        ) {
            let income: Vec<EconomicItem> = income
                .into_iter()
                .map(|v| EconomicItem::new("E", "", f64::from(v)))
                .collect();
            let expenses: Vec<EconomicItem> = expenses
                .into_iter()
                .map(|v| EconomicItem::new("U", "", f64::from(v)))
                .collect();
            let totals = totalize_account(&income, &expenses);
            prop_assert!((totals.balance - (totals.total_income - totals.total_expense)).abs() < 1e-9);
        }
    }
}
