use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

// ---------------------------------------------------------------------------
// Gender – closed set of customer gender labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" => Ok(Gender::Female),
            "male" | "m" => Ok(Gender::Male),
            other => Err(format!("unknown gender label '{other}'")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// AgeGroup – fixed buckets derived from the customer age
// ---------------------------------------------------------------------------

/// Age bucket with breakpoints `[0, 18, 25, 35, 45, 55, 65, 100)`.
///
/// Buckets are inclusive-lower / exclusive-upper. Ages of 100 and above are
/// clamped into [`AgeGroup::Over65`], so every record has exactly one group.
/// Variant order is the natural reading order used by the age-group chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeGroup {
    Under18,
    From18To24,
    From25To34,
    From35To44,
    From45To54,
    From55To64,
    Over65,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 7] = [
        AgeGroup::Under18,
        AgeGroup::From18To24,
        AgeGroup::From25To34,
        AgeGroup::From35To44,
        AgeGroup::From45To54,
        AgeGroup::From55To64,
        AgeGroup::Over65,
    ];

    pub fn from_age(age: u32) -> Self {
        match age {
            0..=17 => AgeGroup::Under18,
            18..=24 => AgeGroup::From18To24,
            25..=34 => AgeGroup::From25To34,
            35..=44 => AgeGroup::From35To44,
            45..=54 => AgeGroup::From45To54,
            55..=64 => AgeGroup::From55To64,
            _ => AgeGroup::Over65,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        AgeGroup::ALL.into_iter().find(|g| g.label() == label.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under18 => "<18",
            AgeGroup::From18To24 => "18-24",
            AgeGroup::From25To34 => "25-34",
            AgeGroup::From35To44 => "35-44",
            AgeGroup::From45To54 => "45-54",
            AgeGroup::From55To64 => "55-64",
            AgeGroup::Over65 => "65+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// YearMonth – calendar month bucket for the sales trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// Dimension – the categorical filter axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Category,
    Mall,
    Gender,
    PaymentMethod,
    AgeGroup,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Category,
        Dimension::Mall,
        Dimension::Gender,
        Dimension::PaymentMethod,
        Dimension::AgeGroup,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Category => "Category",
            Dimension::Mall => "Shopping Mall",
            Dimension::Gender => "Gender",
            Dimension::PaymentMethod => "Payment Method",
            Dimension::AgeGroup => "Age Group",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one transaction
// ---------------------------------------------------------------------------

/// A single sales transaction (one row of the source file).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Invoice identifier, shown in the preview table only.
    pub invoice_no: Option<String>,
    pub invoice_date: NaiveDate,
    pub category: String,
    pub shopping_mall: String,
    pub gender: Gender,
    pub payment_method: String,
    pub age: u32,
    /// Always > 0.
    pub quantity: u32,
    /// Always finite and >= 0.
    pub total_price: f64,
    pub customer_id: String,
    /// Derived from `age` once at load time.
    pub age_group: AgeGroup,
}

// ---------------------------------------------------------------------------
// Dataset – the complete, immutable loaded table
// ---------------------------------------------------------------------------

/// Inclusive date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `start > end`; such a range matches nothing.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Distinct values per categorical dimension, used as filter-option universes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universes {
    pub categories: BTreeSet<String>,
    pub malls: BTreeSet<String>,
    pub genders: BTreeSet<Gender>,
    pub payment_methods: BTreeSet<String>,
    pub age_groups: BTreeSet<AgeGroup>,
}

impl Universes {
    /// Display labels of one dimension's universe, in universe order.
    pub fn labels(&self, dim: Dimension) -> Vec<String> {
        match dim {
            Dimension::Category => self.categories.iter().cloned().collect(),
            Dimension::Mall => self.malls.iter().cloned().collect(),
            Dimension::Gender => self.genders.iter().map(|g| g.to_string()).collect(),
            Dimension::PaymentMethod => self.payment_methods.iter().cloned().collect(),
            Dimension::AgeGroup => self.age_groups.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// The full parsed dataset with pre-computed date bounds and universes.
///
/// Built once by the loader and never mutated afterwards, so it can be shared
/// behind an `Arc` by any number of readers.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    date_bounds: DateRange,
    universes: Universes,
}

impl Dataset {
    /// Build the derived indices. Returns `None` for an empty record list,
    /// which has no date bounds.
    pub fn from_records(records: Vec<Record>) -> Option<Self> {
        let first = records.first()?.invoice_date;
        let mut date_bounds = DateRange::new(first, first);
        let mut universes = Universes::default();

        for rec in &records {
            date_bounds.start = date_bounds.start.min(rec.invoice_date);
            date_bounds.end = date_bounds.end.max(rec.invoice_date);
            if !universes.categories.contains(&rec.category) {
                universes.categories.insert(rec.category.clone());
            }
            if !universes.malls.contains(&rec.shopping_mall) {
                universes.malls.insert(rec.shopping_mall.clone());
            }
            if !universes.payment_methods.contains(&rec.payment_method) {
                universes.payment_methods.insert(rec.payment_method.clone());
            }
            universes.genders.insert(rec.gender);
            universes.age_groups.insert(rec.age_group);
        }

        Some(Dataset {
            records,
            date_bounds,
            universes,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn date_bounds(&self) -> DateRange {
        self.date_bounds
    }

    pub fn universes(&self) -> &Universes {
        &self.universes
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty. Always false for a loaded dataset.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
