use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const ROWS: usize = 10_000;

// (category, min unit price, max unit price)
const CATEGORIES: &[(&str, f64, f64)] = &[
    ("Clothing", 100.0, 300.0),
    ("Shoes", 200.0, 600.0),
    ("Books", 5.0, 15.0),
    ("Cosmetics", 20.0, 40.0),
    ("Food & Beverage", 5.0, 5.5),
    ("Toys", 15.0, 36.0),
    ("Technology", 400.0, 1050.0),
    ("Souvenir", 5.0, 12.0),
];

const MALLS: &[&str] = &[
    "Kanyon",
    "Forum Istanbul",
    "Metrocity",
    "Metropol AVM",
    "Istinye Park",
    "Mall of Istanbul",
    "Emaar Square Mall",
    "Cevahir AVM",
    "Viaport Outlet",
    "Zorlu Center",
];

const PAYMENT_METHODS: &[&str] = &["Cash", "Credit Card", "Debit Card"];
const GENDERS: &[&str] = &["Female", "Male"];

/// One row in the same shape the dashboard loads.
#[derive(Serialize)]
struct SampleRow {
    invoice_no: String,
    customer_id: String,
    gender: &'static str,
    age: i64,
    category: &'static str,
    quantity: i64,
    total_price: f64,
    payment_method: &'static str,
    invoice_date: String,
    shopping_mall: &'static str,
    #[serde(skip)]
    date: NaiveDate,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64() % (hi - lo + 1)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.range(0, items.len() as u64 - 1) as usize]
    }
}

fn generate(rng: &mut SimpleRng, first_day: NaiveDate, span_days: u64) -> Vec<SampleRow> {
    (0..ROWS)
        .map(|_| {
            let &(category, lo, hi) = rng.pick(CATEGORIES);
            let quantity = rng.range(1, 5) as i64;
            let unit_price = lo + (hi - lo) * rng.next_f64();
            let total_price = (unit_price * quantity as f64 * 100.0).round() / 100.0;
            let date = first_day + Days::new(rng.range(0, span_days));

            SampleRow {
                invoice_no: format!("I{}", rng.range(100_000, 999_999)),
                customer_id: format!("C{}", rng.range(100_000, 999_999)),
                gender: *rng.pick(GENDERS),
                age: rng.range(18, 69) as i64,
                category,
                quantity,
                total_price,
                payment_method: *rng.pick(PAYMENT_METHODS),
                invoice_date: date.format("%m/%d/%y").to_string(),
                shopping_mall: *rng.pick(MALLS),
                date,
            }
        })
        .collect()
}

fn write_json(rows: &[SampleRow], path: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    serde_json::to_writer(BufWriter::new(file), rows).context("writing JSON")?;
    Ok(())
}

fn write_parquet(rows: &[SampleRow], path: &str) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch date")?;
    let strings = |f: fn(&SampleRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("invoice_no", DataType::Utf8, false),
        Field::new("customer_id", DataType::Utf8, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("quantity", DataType::Int64, false),
        Field::new("total_price", DataType::Float64, false),
        Field::new("payment_method", DataType::Utf8, false),
        Field::new("invoice_date", DataType::Date32, false),
        Field::new("shopping_mall", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(|r| r.invoice_no.as_str()),
            strings(|r| r.customer_id.as_str()),
            strings(|r| r.gender),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.age).collect::<Vec<_>>())),
            strings(|r| r.category),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.quantity).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.total_price).collect::<Vec<_>>(),
            )),
            strings(|r| r.payment_method),
            Arc::new(Date32Array::from(
                rows.iter()
                    .map(|r| (r.date - epoch).num_days() as i32)
                    .collect::<Vec<_>>(),
            )),
            strings(|r| r.shopping_mall),
        ],
    )
    .context("building record batch")?;

    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // 01/01/21 through 03/08/23
    let first_day = NaiveDate::from_ymd_opt(2021, 1, 1).context("start date")?;
    let last_day = NaiveDate::from_ymd_opt(2023, 3, 8).context("end date")?;
    let span_days = (last_day - first_day).num_days() as u64;

    let rows = generate(&mut rng, first_day, span_days);

    write_json(&rows, "data.json")?;
    write_parquet(&rows, "data.parquet")?;

    println!("Wrote {} transactions to data.json and data.parquet", rows.len());
    Ok(())
}
