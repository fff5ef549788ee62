//! Scalar KPIs and per-dimension rollups over a [`FilteredView`].
//!
//! Everything is computed in one pass over the view; the full dataset is
//! never consulted. Groupings are returned as ordered `(key, measure)` lists:
//!
//! | grouping            | measure      | order                          |
//! |---------------------|--------------|--------------------------------|
//! | `by_category`       | sales        | sales desc, then name          |
//! | `by_mall`           | sales        | sales desc, then name          |
//! | `by_month`          | sales        | month asc (sparse)             |
//! | `by_payment_method` | record count | count desc, then name          |
//! | `by_gender`         | sales        | `Gender` order                 |
//! | `by_age_group`      | sales        | bucket order (`<18` .. `65+`)  |
//!
//! Keys with no records in the view are absent; nothing is zero-filled.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::filter::FilteredView;
use super::model::{AgeGroup, Gender, YearMonth};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kpis {
    pub total_sales: f64,
    pub transaction_count: usize,
    /// `total_sales / transaction_count`, or 0 for an empty view.
    pub average_order_value: f64,
    pub unique_customers: usize,
    pub total_quantity: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub kpis: Kpis,
    pub by_category: Vec<(String, f64)>,
    pub by_mall: Vec<(String, f64)>,
    pub by_month: Vec<(YearMonth, f64)>,
    pub by_payment_method: Vec<(String, usize)>,
    pub by_gender: Vec<(Gender, f64)>,
    pub by_age_group: Vec<(AgeGroup, f64)>,
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.kpis.transaction_count == 0
    }

    /// Payment-method counts as fractions of all transactions.
    pub fn payment_shares(&self) -> Vec<(String, f64)> {
        let total = self.kpis.transaction_count;
        if total == 0 {
            return Vec::new();
        }
        self.by_payment_method
            .iter()
            .map(|(method, count)| (method.clone(), *count as f64 / total as f64))
            .collect()
    }
}

/// Compute the KPIs and every grouping for one filtered view.
pub fn summarize(view: &FilteredView<'_>) -> MetricsSnapshot {
    let mut kpis = Kpis::default();
    let mut customers: HashSet<&str> = HashSet::new();
    let mut by_category: HashMap<&str, f64> = HashMap::new();
    let mut by_mall: HashMap<&str, f64> = HashMap::new();
    let mut by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
    let mut by_payment: HashMap<&str, usize> = HashMap::new();
    let mut by_gender: BTreeMap<Gender, f64> = BTreeMap::new();
    let mut by_age_group: BTreeMap<AgeGroup, f64> = BTreeMap::new();

    for rec in view.records() {
        let price = rec.total_price;
        kpis.total_sales += price;
        kpis.transaction_count += 1;
        kpis.total_quantity += u64::from(rec.quantity);
        customers.insert(&rec.customer_id);

        *by_category.entry(&rec.category).or_default() += price;
        *by_mall.entry(&rec.shopping_mall).or_default() += price;
        *by_month.entry(YearMonth::of(rec.invoice_date)).or_default() += price;
        *by_payment.entry(&rec.payment_method).or_default() += 1;
        *by_gender.entry(rec.gender).or_default() += price;
        *by_age_group.entry(rec.age_group).or_default() += price;
    }

    kpis.unique_customers = customers.len();
    if kpis.transaction_count > 0 {
        kpis.average_order_value = kpis.total_sales / kpis.transaction_count as f64;
    }

    let mut by_payment_method: Vec<(String, usize)> = by_payment
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    by_payment_method.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    MetricsSnapshot {
        kpis,
        by_category: ranked(by_category),
        by_mall: ranked(by_mall),
        by_month: by_month.into_iter().collect(),
        by_payment_method,
        by_gender: by_gender.into_iter().collect(),
        by_age_group: by_age_group.into_iter().collect(),
    }
}

/// Sort sales totals descending; equal totals fall back to the key so the
/// order doesn't depend on hash iteration.
fn ranked(groups: HashMap<&str, f64>) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = groups
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{FilterState, apply};
    use crate::data::model::tests::{date, record, three_records};
    use crate::data::model::{Dataset, Dimension};

    fn snapshot_for(ds: &Dataset, filters: &FilterState) -> MetricsSnapshot {
        summarize(&apply(ds, filters))
    }

    fn store_dataset() -> Dataset {
        let mut recs = vec![
            record(date(2022, 12, 30), "Clothing", 300.08),
            record(date(2023, 1, 2), "Shoes", 1800.51),
            record(date(2023, 1, 2), "Clothing", 1500.4),
            record(date(2023, 3, 9), "Books", 15.15),
            record(date(2023, 3, 10), "Toys", 35.84),
        ];
        recs[0].customer_id = "C1".to_string();
        recs[1].customer_id = "C2".to_string();
        recs[2].customer_id = "C1".to_string();
        recs[3].customer_id = "C3".to_string();
        recs[4].customer_id = "C4".to_string();

        recs[1].gender = Gender::Male;
        recs[4].gender = Gender::Male;

        recs[0].shopping_mall = "Metrocity".to_string();
        recs[3].shopping_mall = "Cevahir AVM".to_string();

        recs[1].payment_method = "Credit Card".to_string();
        recs[2].payment_method = "Credit Card".to_string();
        recs[3].payment_method = "Debit Card".to_string();

        recs[0].quantity = 1;
        recs[1].quantity = 3;
        recs[2].quantity = 5;
        recs[3].quantity = 1;
        recs[4].quantity = 2;

        recs[3].age = 17;
        recs[3].age_group = AgeGroup::Under18;
        recs[4].age = 66;
        recs[4].age_group = AgeGroup::Over65;

        Dataset::from_records(recs).unwrap()
    }

    #[test]
    fn category_example_from_three_records() {
        let ds = three_records();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["A"]);
        let snap = snapshot_for(&ds, &filters);

        assert_eq!(snap.kpis.total_sales, 15.0);
        assert_eq!(snap.kpis.transaction_count, 2);
        assert_eq!(snap.kpis.average_order_value, 7.5);
        assert_eq!(snap.by_category, [("A".to_string(), 15.0)]);
    }

    #[test]
    fn monthly_example_from_three_records() {
        let ds = three_records();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        let months: Vec<(String, f64)> = snap
            .by_month
            .iter()
            .map(|(m, v)| (m.to_string(), *v))
            .collect();
        assert_eq!(
            months,
            [("2023-01".to_string(), 30.0), ("2023-02".to_string(), 5.0)]
        );
    }

    #[test]
    fn empty_view_degrades_to_zero() {
        let ds = store_dataset();
        for dim in Dimension::ALL {
            let snap = snapshot_for(&ds, &FilterState::full(&ds).with_none(dim));
            assert!(snap.is_empty());
            assert_eq!(snap, MetricsSnapshot::default(), "{dim}");
            assert_eq!(snap.kpis.average_order_value, 0.0);
            assert!(!snap.kpis.average_order_value.is_nan());
            assert!(snap.payment_shares().is_empty());
        }
    }

    #[test]
    fn kpis_over_full_view() {
        let ds = store_dataset();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        let k = snap.kpis;

        assert_eq!(k.transaction_count, 5);
        assert_eq!(k.unique_customers, 4);
        assert_eq!(k.total_quantity, 12);
        let expected = 300.08 + 1800.51 + 1500.4 + 15.15 + 35.84;
        assert!((k.total_sales - expected).abs() < 1e-9);
        assert!((k.average_order_value - expected / 5.0).abs() < 1e-9);
    }

    #[test]
    fn total_sales_equals_sum_of_category_groups() {
        let ds = store_dataset();
        let filter_sets = [
            FilterState::full(&ds),
            FilterState::full(&ds).with_selection(Dimension::Gender, ["Male"]),
            FilterState::full(&ds).with_selection(Dimension::PaymentMethod, ["Cash", "Debit Card"]),
        ];
        for filters in filter_sets {
            let snap = snapshot_for(&ds, &filters);
            let grouped: f64 = snap.by_category.iter().map(|(_, v)| v).sum();
            assert!((snap.kpis.total_sales - grouped).abs() < 1e-9);
        }
    }

    #[test]
    fn sales_groupings_rank_descending() {
        let ds = store_dataset();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));

        let cats: Vec<&str> = snap.by_category.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(cats, ["Shoes", "Clothing", "Toys", "Books"]);
        assert!((snap.by_category[1].1 - 1800.48).abs() < 1e-9);

        let malls: Vec<&str> = snap.by_mall.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(malls, ["Kanyon", "Metrocity", "Cevahir AVM"]);
    }

    #[test]
    fn equal_sales_tie_break_on_name() {
        let ds = Dataset::from_records(vec![
            record(date(2023, 1, 1), "Zeta", 10.0),
            record(date(2023, 1, 1), "Alpha", 10.0),
        ])
        .unwrap();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        let cats: Vec<&str> = snap.by_category.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(cats, ["Alpha", "Zeta"]);
    }

    #[test]
    fn months_are_sparse_and_ascending_across_years() {
        let ds = store_dataset();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        let months: Vec<String> = snap.by_month.iter().map(|(m, _)| m.to_string()).collect();
        // February has no sales and is omitted.
        assert_eq!(months, ["2022-12", "2023-01", "2023-03"]);
    }

    #[test]
    fn payment_methods_are_counted_not_summed() {
        let ds = store_dataset();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        assert_eq!(
            snap.by_payment_method,
            [
                ("Cash".to_string(), 2),
                ("Credit Card".to_string(), 2),
                ("Debit Card".to_string(), 1),
            ]
        );
        let shares: f64 = snap.payment_shares().iter().map(|(_, s)| s).sum();
        assert!((shares - 1.0).abs() < 1e-12);
        assert_eq!(snap.payment_shares()[2].1, 0.2);
    }

    #[test]
    fn gender_and_age_groups_only_list_present_keys() {
        let ds = store_dataset();
        let filters = FilterState::full(&ds).with_selection(Dimension::Gender, ["Male"]);
        let snap = snapshot_for(&ds, &filters);

        assert_eq!(snap.by_gender.len(), 1);
        assert_eq!(snap.by_gender[0].0, Gender::Male);

        let groups: Vec<AgeGroup> = snap.by_age_group.iter().map(|(g, _)| *g).collect();
        assert_eq!(groups, [AgeGroup::From25To34, AgeGroup::Over65]);
        assert_eq!(snap.by_age_group[1].1, 35.84);
    }

    #[test]
    fn age_groups_follow_bucket_order() {
        let ds = store_dataset();
        let snap = snapshot_for(&ds, &FilterState::full(&ds));
        let groups: Vec<&str> = snap.by_age_group.iter().map(|(g, _)| g.label()).collect();
        assert_eq!(groups, ["<18", "25-34", "65+"]);
    }

    #[test]
    fn summarizing_twice_is_bit_identical() {
        let ds = store_dataset();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["Clothing", "Toys"]);
        let first = snapshot_for(&ds, &filters);
        let second = snapshot_for(&ds, &filters);
        assert_eq!(first, second);
        assert_eq!(
            first.kpis.total_sales.to_bits(),
            second.kpis.total_sales.to_bits()
        );
    }
}
