use std::collections::BTreeSet;

use super::model::{AgeGroup, DateRange, Dataset, Dimension, Gender, Record, Universes};
use crate::error::{EmptyReason, EmptyResultWarning};

// ---------------------------------------------------------------------------
// Filter predicate: date interval plus one selection set per dimension
// ---------------------------------------------------------------------------

/// Snapshot of every filter selection.
///
/// A record passes when its invoice date lies in `date_range` (both ends
/// inclusive) and its value for every dimension is in that dimension's set.
/// An empty set therefore hides everything. Changes produce a new state; the
/// builder methods below consume `self` and return the replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub date_range: DateRange,
    pub categories: BTreeSet<String>,
    pub malls: BTreeSet<String>,
    pub genders: BTreeSet<Gender>,
    pub payment_methods: BTreeSet<String>,
    pub age_groups: BTreeSet<AgeGroup>,
}

impl FilterState {
    /// Full date range and every value selected (i.e., show everything).
    pub fn full(dataset: &Dataset) -> Self {
        let universes = dataset.universes();
        FilterState {
            date_range: dataset.date_bounds(),
            categories: universes.categories.clone(),
            malls: universes.malls.clone(),
            genders: universes.genders.clone(),
            payment_methods: universes.payment_methods.clone(),
            age_groups: universes.age_groups.clone(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    /// Replace one dimension's selection with the given labels.
    ///
    /// Gender and age group have a closed vocabulary: a label that names no
    /// gender or age group is dropped here, so selecting only such labels
    /// leaves an empty selection. Open dimensions keep unknown labels, which
    /// then never match (see [`FilterState::unknown_values`]).
    pub fn with_selection<I, S>(mut self, dim: Dimension, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels.into_iter();
        match dim {
            Dimension::Category => {
                self.categories = labels.map(|l| l.as_ref().to_string()).collect()
            }
            Dimension::Mall => self.malls = labels.map(|l| l.as_ref().to_string()).collect(),
            Dimension::PaymentMethod => {
                self.payment_methods = labels.map(|l| l.as_ref().to_string()).collect()
            }
            Dimension::Gender => {
                self.genders = labels.filter_map(|l| l.as_ref().parse::<Gender>().ok()).collect()
            }
            Dimension::AgeGroup => {
                self.age_groups = labels.filter_map(|l| AgeGroup::from_label(l.as_ref())).collect()
            }
        }
        self
    }

    /// Flip one value in or out of a dimension's selection.
    pub fn toggled(self, dim: Dimension, label: &str) -> Self {
        let label = canonical_label(dim, label);
        let mut labels = self.selected_labels(dim);
        if !labels.remove(&label) {
            labels.insert(label);
        }
        self.with_selection(dim, labels)
    }

    pub fn with_all(self, dim: Dimension, universes: &Universes) -> Self {
        self.with_selection(dim, universes.labels(dim))
    }

    pub fn with_none(self, dim: Dimension) -> Self {
        self.with_selection(dim, std::iter::empty::<&str>())
    }

    /// Selected values of one dimension as display labels.
    pub fn selected_labels(&self, dim: Dimension) -> BTreeSet<String> {
        match dim {
            Dimension::Category => self.categories.clone(),
            Dimension::Mall => self.malls.clone(),
            Dimension::PaymentMethod => self.payment_methods.clone(),
            Dimension::Gender => self.genders.iter().map(|g| g.to_string()).collect(),
            Dimension::AgeGroup => self.age_groups.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn is_selected(&self, dim: Dimension, label: &str) -> bool {
        match dim {
            Dimension::Category => self.categories.contains(label),
            Dimension::Mall => self.malls.contains(label),
            Dimension::PaymentMethod => self.payment_methods.contains(label),
            Dimension::Gender => label
                .parse::<Gender>()
                .is_ok_and(|g| self.genders.contains(&g)),
            Dimension::AgeGroup => {
                AgeGroup::from_label(label).is_some_and(|a| self.age_groups.contains(&a))
            }
        }
    }

    pub fn selection_len(&self, dim: Dimension) -> usize {
        match dim {
            Dimension::Category => self.categories.len(),
            Dimension::Mall => self.malls.len(),
            Dimension::Gender => self.genders.len(),
            Dimension::PaymentMethod => self.payment_methods.len(),
            Dimension::AgeGroup => self.age_groups.len(),
        }
    }

    /// Selected values that are not in the dataset's universe (e.g. left over
    /// from a previously loaded file). They are harmless: they never match.
    pub fn unknown_values(&self, dataset: &Dataset) -> Vec<(Dimension, String)> {
        let universes = dataset.universes();
        let mut unknown = Vec::new();
        for dim in Dimension::ALL {
            let known: BTreeSet<String> = universes.labels(dim).into_iter().collect();
            unknown.extend(
                self.selected_labels(dim)
                    .into_iter()
                    .filter(|label| !known.contains(label))
                    .map(|label| (dim, label)),
            );
        }
        unknown
    }

    /// Drop every selected value that is not in the dataset's universe.
    pub fn retain_known(self, dataset: &Dataset) -> Self {
        let u = dataset.universes();
        FilterState {
            date_range: self.date_range,
            categories: self.categories.intersection(&u.categories).cloned().collect(),
            malls: self.malls.intersection(&u.malls).cloned().collect(),
            genders: self.genders.intersection(&u.genders).copied().collect(),
            payment_methods: self
                .payment_methods
                .intersection(&u.payment_methods)
                .cloned()
                .collect(),
            age_groups: self.age_groups.intersection(&u.age_groups).copied().collect(),
        }
    }

    fn first_empty_selection(&self) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|dim| self.selection_len(*dim) == 0)
    }
}

/// Display form of a label, so aliases like `F` compare equal to `Female`.
fn canonical_label(dim: Dimension, label: &str) -> String {
    let canonical = match dim {
        Dimension::Gender => label.parse::<Gender>().ok().map(|g| g.to_string()),
        Dimension::AgeGroup => AgeGroup::from_label(label).map(|a| a.to_string()),
        Dimension::Category | Dimension::Mall | Dimension::PaymentMethod => None,
    };
    canonical.unwrap_or_else(|| label.to_string())
}

// ---------------------------------------------------------------------------
// Scan plan: the predicates that actually constrain this dataset
// ---------------------------------------------------------------------------

/// A selection that covers the whole universe can't reject anything, so it
/// is left out of the per-record checks.
struct ScanPlan<'f> {
    date_range: Option<DateRange>,
    categories: Option<&'f BTreeSet<String>>,
    malls: Option<&'f BTreeSet<String>>,
    genders: Option<&'f BTreeSet<Gender>>,
    payment_methods: Option<&'f BTreeSet<String>>,
    age_groups: Option<&'f BTreeSet<AgeGroup>>,
}

fn constraining<'f, T: Ord>(selected: &'f BTreeSet<T>, universe: &BTreeSet<T>) -> Option<&'f BTreeSet<T>> {
    if universe.is_subset(selected) {
        None
    } else {
        Some(selected)
    }
}

impl<'f> ScanPlan<'f> {
    fn new(dataset: &Dataset, filters: &'f FilterState) -> Self {
        let u = dataset.universes();
        let bounds = dataset.date_bounds();
        let covers_all_dates =
            filters.date_range.start <= bounds.start && bounds.end <= filters.date_range.end;

        ScanPlan {
            date_range: (!covers_all_dates).then_some(filters.date_range),
            categories: constraining(&filters.categories, &u.categories),
            malls: constraining(&filters.malls, &u.malls),
            genders: constraining(&filters.genders, &u.genders),
            payment_methods: constraining(&filters.payment_methods, &u.payment_methods),
            age_groups: constraining(&filters.age_groups, &u.age_groups),
        }
    }

    fn matches(&self, rec: &Record) -> bool {
        self.date_range.map_or(true, |r| r.contains(rec.invoice_date))
            && self.categories.map_or(true, |s| s.contains(&rec.category))
            && self.malls.map_or(true, |s| s.contains(&rec.shopping_mall))
            && self.genders.map_or(true, |s| s.contains(&rec.gender))
            && self.payment_methods.map_or(true, |s| s.contains(&rec.payment_method))
            && self.age_groups.map_or(true, |s| s.contains(&rec.age_group))
    }

    fn is_unconstrained(&self) -> bool {
        self.date_range.is_none()
            && self.categories.is_none()
            && self.malls.is_none()
            && self.genders.is_none()
            && self.payment_methods.is_none()
            && self.age_groups.is_none()
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// The records of a dataset that pass a [`FilterState`], in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
    empty_reason: Option<EmptyReason>,
}

impl<'a> FilteredView<'a> {
    fn empty(dataset: &'a Dataset, reason: EmptyReason) -> Self {
        FilteredView {
            dataset,
            indices: Vec::new(),
            empty_reason: Some(reason),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Dataset positions of the matching records, ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    /// The first `limit` matching records, for the preview table.
    pub fn preview(&self, limit: usize) -> Vec<&'a Record> {
        self.records().take(limit).collect()
    }

    /// Set when the view is empty; says why.
    pub fn empty_warning(&self) -> Option<EmptyResultWarning> {
        self.empty_reason.map(|reason| EmptyResultWarning { reason })
    }
}

/// Return the records of `dataset` that pass all filters.
///
/// Pure: the same inputs always give the same indices, in dataset order.
/// An inverted date range or an empty selection short-circuits to an empty
/// view without scanning.
pub fn apply<'a>(dataset: &'a Dataset, filters: &FilterState) -> FilteredView<'a> {
    if filters.date_range.is_inverted() {
        return FilteredView::empty(dataset, EmptyReason::InvertedDateRange);
    }
    if let Some(dim) = filters.first_empty_selection() {
        return FilteredView::empty(dataset, EmptyReason::EmptySelection(dim));
    }

    let plan = ScanPlan::new(dataset, filters);
    let indices: Vec<usize> = if plan.is_unconstrained() {
        (0..dataset.len()).collect()
    } else {
        dataset
            .records()
            .iter()
            .enumerate()
            .filter(|(_, rec)| plan.matches(rec))
            .map(|(i, _)| i)
            .collect()
    };

    let empty_reason = indices.is_empty().then_some(EmptyReason::NoMatches);
    FilteredView {
        dataset,
        indices,
        empty_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{date, record, three_records};

    fn mixed_dataset() -> Dataset {
        let mut recs = vec![
            record(date(2023, 1, 5), "Books", 10.0),
            record(date(2023, 1, 20), "Toys", 20.0),
            record(date(2023, 2, 1), "Books", 5.0),
            record(date(2023, 3, 15), "Shoes", 7.5),
        ];
        recs[1].gender = Gender::Male;
        recs[1].shopping_mall = "Metrocity".to_string();
        recs[2].payment_method = "Credit Card".to_string();
        recs[3].age = 70;
        recs[3].age_group = AgeGroup::Over65;
        Dataset::from_records(recs).unwrap()
    }

    #[test]
    fn full_state_keeps_every_record() {
        let ds = mixed_dataset();
        let view = apply(&ds, &FilterState::full(&ds));
        assert_eq!(view.indices(), [0, 1, 2, 3]);
        assert!(view.empty_warning().is_none());
    }

    #[test]
    fn category_selection_keeps_matching_records_in_order() {
        let ds = three_records();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["A"]);
        let view = apply(&ds, &filters);
        assert_eq!(view.indices(), [0, 2]);
        let prices: Vec<f64> = view.records().map(|r| r.total_price).collect();
        assert_eq!(prices, [10.0, 5.0]);
    }

    #[test]
    fn empty_selection_in_any_dimension_matches_nothing() {
        let ds = mixed_dataset();
        for dim in Dimension::ALL {
            let filters = FilterState::full(&ds).with_none(dim);
            let view = apply(&ds, &filters);
            assert!(view.is_empty(), "{dim}");
            assert_eq!(
                view.empty_warning(),
                Some(EmptyResultWarning {
                    reason: EmptyReason::EmptySelection(dim)
                })
            );
        }
    }

    #[test]
    fn inverted_date_range_matches_nothing() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds)
            .with_date_range(DateRange::new(date(2023, 3, 1), date(2023, 1, 1)));
        let view = apply(&ds, &filters);
        assert!(view.is_empty());
        assert_eq!(
            view.empty_warning().map(|w| w.reason),
            Some(EmptyReason::InvertedDateRange)
        );
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds)
            .with_date_range(DateRange::new(date(2023, 1, 20), date(2023, 2, 1)));
        assert_eq!(apply(&ds, &filters).indices(), [1, 2]);

        let single_day = FilterState::full(&ds)
            .with_date_range(DateRange::new(date(2023, 3, 15), date(2023, 3, 15)));
        assert_eq!(apply(&ds, &single_day).indices(), [3]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds)
            .with_selection(Dimension::Category, ["Books", "Toys"])
            .with_selection(Dimension::Gender, ["Female"])
            .with_selection(Dimension::PaymentMethod, ["Cash"]);
        assert_eq!(apply(&ds, &filters).indices(), [0]);

        let by_age = FilterState::full(&ds).with_selection(Dimension::AgeGroup, ["65+"]);
        assert_eq!(apply(&ds, &by_age).indices(), [3]);

        let by_mall = FilterState::full(&ds).with_selection(Dimension::Mall, ["Metrocity"]);
        assert_eq!(apply(&ds, &by_mall).indices(), [1]);
    }

    #[test]
    fn satisfiable_filters_without_hits_report_no_matches() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds)
            .with_selection(Dimension::Category, ["Shoes"])
            .with_selection(Dimension::Gender, ["Male"]);
        let view = apply(&ds, &filters);
        assert!(view.is_empty());
        assert_eq!(
            view.empty_warning().map(|w| w.reason),
            Some(EmptyReason::NoMatches)
        );
    }

    #[test]
    fn applying_twice_is_identical() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["Books"]);
        let first = apply(&ds, &filters);
        let second = apply(&ds, &filters);
        assert_eq!(first.indices(), second.indices());
        assert_eq!(first.empty_warning(), second.empty_warning());
    }

    #[test]
    fn unknown_selection_values_are_ignored() {
        let ds = three_records();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["A", "Z"]);
        assert_eq!(apply(&ds, &filters).indices(), [0, 2]);
        assert_eq!(
            filters.unknown_values(&ds),
            [(Dimension::Category, "Z".to_string())]
        );

        let cleaned = filters.retain_known(&ds);
        assert!(cleaned.unknown_values(&ds).is_empty());
        assert_eq!(cleaned.selected_labels(Dimension::Category).len(), 1);
    }

    #[test]
    fn only_unknown_values_match_nothing() {
        let ds = three_records();
        let filters = FilterState::full(&ds).with_selection(Dimension::Category, ["Z"]);
        let view = apply(&ds, &filters);
        assert!(view.is_empty());
        assert_eq!(
            view.empty_warning().map(|w| w.reason),
            Some(EmptyReason::NoMatches)
        );
    }

    #[test]
    fn toggling_flips_membership() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds).toggled(Dimension::Category, "Toys");
        assert!(!filters.is_selected(Dimension::Category, "Toys"));
        assert_eq!(apply(&ds, &filters).indices(), [0, 2, 3]);

        let filters = filters.toggled(Dimension::Category, "Toys");
        assert!(filters.is_selected(Dimension::Category, "Toys"));

        let filters = filters.toggled(Dimension::Gender, "Male");
        assert!(!filters.is_selected(Dimension::Gender, "Male"));
        assert!(filters.is_selected(Dimension::Gender, "Female"));
    }

    #[test]
    fn toggling_accepts_label_aliases() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds).toggled(Dimension::Gender, "f");
        assert!(!filters.is_selected(Dimension::Gender, "Female"));
        assert_eq!(filters.selection_len(Dimension::Gender), 1);

        let filters = filters.toggled(Dimension::Gender, "F");
        assert_eq!(filters.selection_len(Dimension::Gender), 2);
        assert_eq!(filters, FilterState::full(&ds));

        let filters = filters.toggled(Dimension::AgeGroup, " 65+ ");
        assert!(!filters.is_selected(Dimension::AgeGroup, "65+"));
    }

    #[test]
    fn closed_dimensions_drop_unparseable_labels() {
        let ds = three_records();

        // Not a gender at all: nothing is kept, so the selection is empty.
        let filters = FilterState::full(&ds).with_selection(Dimension::Gender, ["Other"]);
        assert_eq!(filters.selection_len(Dimension::Gender), 0);
        assert!(filters.unknown_values(&ds).is_empty());
        assert_eq!(
            apply(&ds, &filters).empty_warning().map(|w| w.reason),
            Some(EmptyReason::EmptySelection(Dimension::Gender))
        );

        // A real gender absent from this dataset behaves like an unknown category.
        let filters = FilterState::full(&ds).with_selection(Dimension::Gender, ["Male"]);
        assert_eq!(
            filters.unknown_values(&ds),
            [(Dimension::Gender, "Male".to_string())]
        );
        assert_eq!(
            apply(&ds, &filters).empty_warning().map(|w| w.reason),
            Some(EmptyReason::NoMatches)
        );
    }

    #[test]
    fn select_all_restores_the_universe() {
        let ds = mixed_dataset();
        let filters = FilterState::full(&ds)
            .with_none(Dimension::AgeGroup)
            .with_all(Dimension::AgeGroup, ds.universes());
        assert_eq!(filters, FilterState::full(&ds));
    }

    #[test]
    fn preview_is_capped() {
        let ds = mixed_dataset();
        let view = apply(&ds, &FilterState::full(&ds));
        let preview = view.preview(2);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].category, "Books");
        assert_eq!(view.preview(100).len(), 4);
    }
}
