//! Groups economic line items by category for on-screen summaries and the
//! printable report.

use std::cmp::Ordering;
use std::collections::HashMap;

use ads_domain::{non_blank, Amounted, Described, EconomicItem};
use serde::Serialize;

/// Label used for items without a category.
pub const FALLBACK_CATEGORY: &str = "Altro";

/// Line items that can be bucketed by category name.
pub trait Categorized: Amounted + Described {
    fn category(&self) -> Option<&str>;
}

impl Categorized for EconomicItem {
    fn category(&self) -> Option<&str> {
        non_blank(Some(&self.category))
    }
}

/// On-screen aggregate: totals plus the concatenated item descriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "importo")]
    pub amount: f64,
    #[serde(rename = "numeroVoci")]
    pub item_count: usize,
    #[serde(rename = "descrizione")]
    pub descriptions: String,
}

/// Printable aggregate without free text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "importo")]
    pub amount: f64,
    #[serde(rename = "numeroVoci")]
    pub item_count: usize,
}

#[derive(Default)]
struct Bucket {
    amount: f64,
    item_count: usize,
    descriptions: Vec<String>,
}

fn bucketize<I: Categorized>(items: &[I], keep_descriptions: bool) -> Vec<(String, Bucket)> {
    let mut buckets: HashMap<String, Bucket> = HashMap::new();
    for item in items {
        let name = item.category().unwrap_or(FALLBACK_CATEGORY).to_string();
        let bucket = buckets.entry(name).or_default();
        bucket.amount += item.amount();
        bucket.item_count += 1;
        if keep_descriptions {
            if let Some(text) = item.description() {
                bucket.descriptions.push(text.to_string());
            }
        }
    }
    let mut ordered: Vec<(String, Bucket)> = buckets.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| compare_labels(a, b));
    ordered
}

/// Groups items by category, summing amounts and joining descriptions with `"; "`.
pub fn aggregate_by_category<I: Categorized>(items: &[I]) -> Vec<CategoryGroup> {
    bucketize(items, true)
        .into_iter()
        .map(|(category, bucket)| {
            let descriptions = if bucket.descriptions.is_empty() {
                count_placeholder(bucket.item_count)
            } else {
                bucket.descriptions.join("; ")
            };
            CategoryGroup {
                category,
                amount: bucket.amount,
                item_count: bucket.item_count,
                descriptions,
            }
        })
        .collect()
}

/// Groups items by category for fixed-layout documents: totals only.
pub fn aggregate_for_pdf<I: Categorized>(items: &[I]) -> Vec<CategoryTotal> {
    bucketize(items, false)
        .into_iter()
        .map(|(category, bucket)| CategoryTotal {
            category,
            amount: bucket.amount,
            item_count: bucket.item_count,
        })
        .collect()
}

fn count_placeholder(count: usize) -> String {
    if count == 1 {
        "1 voce".to_string()
    } else {
        format!("{count} voci")
    }
}

/// Orders labels the way an Italian reader expects: case and accents are
/// ignored first, the raw text breaks ties so the order stays total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(label: &str) -> String {
    label
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(category: &str, description: &str, amount: f64) -> EconomicItem {
        EconomicItem::new(category, description, amount)
    }

    #[test]
    fn groups_expenses_by_category() {
        let expenses = vec![
            item("Farmaci", "Farmacia centrale", 300.0),
            item("Farmaci", "  Ticket  ", 50.0),
        ];
        let groups = aggregate_by_category(&expenses);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, "Farmaci");
        assert_eq!(groups[0].amount, 350.0);
        assert_eq!(groups[0].item_count, 2);
        assert_eq!(groups[0].descriptions, "Farmacia centrale; Ticket");
    }

    #[test]
    fn missing_category_falls_back_and_placeholder_counts_items() {
        let items = vec![item("", "", 10.0), item("  ", "", 5.0)];
        let groups = aggregate_by_category(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].category, FALLBACK_CATEGORY);
        assert_eq!(groups[0].descriptions, "2 voci");

        let single = aggregate_by_category(&[item("Luce", "", 1.0)]);
        assert_eq!(single[0].descriptions, "1 voce");
    }

    #[test]
    fn non_finite_amounts_count_as_zero() {
        let items = vec![item("Affitto", "x", f64::NAN), item("Affitto", "y", 400.0)];
        let groups = aggregate_for_pdf(&items);
        assert_eq!(groups[0].amount, 400.0);
        assert_eq!(groups[0].item_count, 2);
    }

    #[test]
    fn output_sorted_ignoring_case_and_accents() {
        let items = vec![
            item("utenze", "", 1.0),
            item("Alimentari", "", 1.0),
            item("Éventi", "", 1.0),
            item("bollette", "", 1.0),
        ];
        let names: Vec<String> = aggregate_for_pdf(&items)
            .into_iter()
            .map(|group| group.category)
            .collect();
        assert_eq!(names, vec!["Alimentari", "bollette", "Éventi", "utenze"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let items: Vec<EconomicItem> = Vec::new();
        assert!(aggregate_by_category(&items).is_empty());
        assert!(aggregate_for_pdf(&items).is_empty());
    }

    #[test]
    fn groups_serialize_with_wire_names() {
        let groups = aggregate_for_pdf(&[item("Farmaci", "", 350.0)]);
        let value = serde_json::to_value(&groups[0]).expect("serialize group");
        assert_eq!(value["categoria"], "Farmaci");
        assert_eq!(value["numeroVoci"], 1);
    }

    fn arb_items() -> impl Strategy<Value = Vec<EconomicItem>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["", "Farmaci", "Pensione", "Affitto", "affitto"]),
                prop::sample::select(vec!["", "nota", " altra "]),
                0u32..10_000,
            )
                .prop_map(|(category, description, cents)| {
                    item(category, description, f64::from(cents))
                }),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn aggregation_is_a_lossless_partition(items in arb_items()) {
            let groups = aggregate_by_category(&items);
            let raw_total: f64 = items.iter().map(|i| i.amount).sum();
            let grouped_total: f64 = groups.iter().map(|g| g.amount).sum();
            prop_assert!((raw_total - grouped_total).abs() < 1e-6);
            let counted: usize = groups.iter().map(|g| g.item_count).sum();
            prop_assert_eq!(counted, items.len());
        }

        #[test]
        fn aggregation_ignores_input_order(items in arb_items()) {
            let mut reversed = items.clone();
            reversed.reverse();
            let forward = aggregate_for_pdf(&items);
            let backward = aggregate_for_pdf(&reversed);
            prop_assert_eq!(forward.len(), backward.len());
            for (a, b) in forward.iter().zip(backward.iter()) {
                prop_assert_eq!(&a.category, &b.category);
                prop_assert_eq!(a.item_count, b.item_count);
                prop_assert!((a.amount - b.amount).abs() < 1e-6);
            }
        }
    }
}
