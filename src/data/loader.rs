use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::util::display::array_value_to_string;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{AgeGroup, Dataset, Gender, Record};
use crate::error::LoadError;

/// Invoice dates are month/day/two-digit-year, e.g. `01/05/23`.
pub const DATE_FORMAT: &str = "%m/%d/%y";

/// Columns every source must provide (`invoice_no` is optional).
const REQUIRED_COLUMNS: [&str; 9] = [
    "invoice_date",
    "category",
    "shopping_mall",
    "gender",
    "payment_method",
    "age",
    "quantity",
    "total_price",
    "customer_id",
];

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// What to do with a row that fails type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRowPolicy {
    /// Abort the load with [`LoadError::InvalidRow`].
    #[default]
    Reject,
    /// Quarantine the row: log it, count it, and leave it out of the dataset.
    Skip,
}

impl FromStr for InvalidRowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(InvalidRowPolicy::Reject),
            "skip" => Ok(InvalidRowPolicy::Skip),
            other => Err(format!("expected 'reject' or 'skip', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub invalid_rows: InvalidRowPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows read from the source, valid or not.
    pub total_rows: usize,
    /// Rows left out under [`InvalidRowPolicy::Skip`].
    pub skipped_rows: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub report: LoadReport,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.json`            – `[{ "invoice_date": "01/05/23", "category": ..., ... }, ...]`
/// * `.jsonl`/`.ndjson` – one such object per line
/// * `.csv`             – header row with the same field names
/// * `.parquet`         – one column per field; `invoice_date` as Date32 or text
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<LoadedDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut rows = RowCollector::new(*options);
    match ext.as_str() {
        "json" => load_json(path, &mut rows)?,
        "jsonl" | "ndjson" => load_json_lines(path, &mut rows)?,
        "csv" => load_csv(path, &mut rows)?,
        "parquet" | "pq" => load_parquet(path, &mut rows)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    }

    let loaded = rows.finish()?;
    log::info!(
        "Loaded {} records from {} ({} of {} rows skipped)",
        loaded.dataset.len(),
        path.display(),
        loaded.report.skipped_rows,
        loaded.report.total_rows
    );
    Ok(loaded)
}

/// Parse an invoice date in [`DATE_FORMAT`].
pub fn parse_invoice_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Load-once cache
// ---------------------------------------------------------------------------

/// Process-lifetime handle to one dataset file.
///
/// The first successful [`get_or_load`](Self::get_or_load) parses the file;
/// later calls hand out the same `Arc<Dataset>`. A failed load leaves the
/// cache empty so the caller may retry.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    options: LoadOptions,
    cell: OnceCell<Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>, options: LoadOptions) -> Self {
        DatasetCache {
            path: path.into(),
            options,
            cell: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_load(&self) -> Result<Arc<Dataset>, LoadError> {
        self.cell
            .get_or_try_init(|| {
                let loaded = load_file(&self.path, &self.options)?;
                Ok(Arc::new(loaded.dataset))
            })
            .cloned()
    }

    /// The cached dataset, if a load already succeeded.
    pub fn get(&self) -> Option<Arc<Dataset>> {
        self.cell.get().cloned()
    }
}

// ---------------------------------------------------------------------------
// Raw rows and coercion
// ---------------------------------------------------------------------------

/// A loosely-typed cell as found in the source file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Only produced by typed Parquet columns.
    #[serde(skip_deserializing)]
    Date(NaiveDate),
}

/// One source row before coercion. Every field is optional here so that a
/// missing value is reported with its field name rather than as a parse error.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    invoice_no: Option<CellValue>,
    #[serde(default)]
    invoice_date: Option<CellValue>,
    #[serde(default)]
    category: Option<CellValue>,
    #[serde(default)]
    shopping_mall: Option<CellValue>,
    #[serde(default)]
    gender: Option<CellValue>,
    #[serde(default)]
    payment_method: Option<CellValue>,
    #[serde(default)]
    age: Option<CellValue>,
    #[serde(default)]
    quantity: Option<CellValue>,
    #[serde(default)]
    total_price: Option<CellValue>,
    #[serde(default)]
    customer_id: Option<CellValue>,
}

impl RawRecord {
    fn into_record(self, row: usize) -> Result<Record, LoadError> {
        let field = |name: &'static str, cell: Option<CellValue>| Field { row, name, cell };

        let age = field("age", self.age).integer()?;
        if age < 0 {
            return Err(invalid(row, "age", format!("negative age {age}")));
        }
        // Anything past u32 is far beyond the last breakpoint anyway.
        let age = u32::try_from(age).unwrap_or(u32::MAX);

        let quantity = field("quantity", self.quantity).integer()?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| invalid(row, "quantity", format!("{quantity} is not a positive count")))?;

        let total_price = field("total_price", self.total_price).float()?;
        if total_price < 0.0 {
            return Err(invalid(row, "total_price", format!("negative price {total_price}")));
        }

        let gender = field("gender", self.gender)
            .text()?
            .parse::<Gender>()
            .map_err(|reason| invalid(row, "gender", reason))?;

        let invoice_no = match self.invoice_no {
            Some(cell) => Some(field("invoice_no", Some(cell)).text()?),
            None => None,
        };

        Ok(Record {
            invoice_no,
            invoice_date: field("invoice_date", self.invoice_date).date()?,
            category: field("category", self.category).text()?,
            shopping_mall: field("shopping_mall", self.shopping_mall).text()?,
            gender,
            payment_method: field("payment_method", self.payment_method).text()?,
            age,
            quantity,
            total_price,
            customer_id: field("customer_id", self.customer_id).text()?,
            age_group: AgeGroup::from_age(age),
        })
    }
}

fn invalid(row: usize, field: &'static str, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidRow {
        row,
        field,
        reason: reason.into(),
    }
}

/// A cell together with where it came from, for error reporting.
struct Field {
    row: usize,
    name: &'static str,
    cell: Option<CellValue>,
}

impl Field {
    fn required(self) -> Result<(CellValue, usize, &'static str), LoadError> {
        match self.cell {
            Some(cell) => Ok((cell, self.row, self.name)),
            None => Err(invalid(self.row, self.name, "missing value")),
        }
    }

    fn integer(self) -> Result<i64, LoadError> {
        let (cell, row, name) = self.required()?;
        let parsed = match &cell {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(f) => integral(*f),
            CellValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            CellValue::Date(_) => None,
        };
        parsed.ok_or_else(|| invalid(row, name, format!("{cell:?} is not an integer")))
    }

    fn float(self) -> Result<f64, LoadError> {
        let (cell, row, name) = self.required()?;
        let parsed = match &cell {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Date(_) => None,
        };
        parsed
            .filter(|f| f.is_finite())
            .ok_or_else(|| invalid(row, name, format!("{cell:?} is not a number")))
    }

    fn text(self) -> Result<String, LoadError> {
        let (cell, row, name) = self.required()?;
        let text = match cell {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Date(d) => d.format(DATE_FORMAT).to_string(),
        };
        if text.is_empty() {
            return Err(invalid(row, name, "empty value"));
        }
        Ok(text)
    }

    fn date(self) -> Result<NaiveDate, LoadError> {
        let (cell, row, name) = self.required()?;
        match cell {
            CellValue::Date(d) => Ok(d),
            CellValue::Text(s) => parse_invoice_date(&s)
                .map_err(|e| invalid(row, name, format!("'{s}' is not a {DATE_FORMAT} date: {e}"))),
            other => Err(invalid(row, name, format!("{other:?} is not a date"))),
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

// ---------------------------------------------------------------------------
// Row collection (shared by every format)
// ---------------------------------------------------------------------------

struct RowCollector {
    options: LoadOptions,
    records: Vec<Record>,
    report: LoadReport,
}

impl RowCollector {
    fn new(options: LoadOptions) -> Self {
        RowCollector {
            options,
            records: Vec::new(),
            report: LoadReport::default(),
        }
    }

    /// Index the next row will get.
    fn next_row(&self) -> usize {
        self.report.total_rows
    }

    /// Accept one parsed row. Row-level failures go through the invalid-row
    /// policy; anything else is returned as fatal.
    fn push(&mut self, raw: Result<RawRecord, LoadError>) -> Result<(), LoadError> {
        let row = self.next_row();
        self.report.total_rows += 1;

        match raw.and_then(|raw| raw.into_record(row)) {
            Ok(record) => {
                self.records.push(record);
                Ok(())
            }
            Err(err @ LoadError::InvalidRow { .. }) => match self.options.invalid_rows {
                InvalidRowPolicy::Reject => Err(err),
                InvalidRowPolicy::Skip => {
                    log::warn!("Skipping invalid row: {err}");
                    self.report.skipped_rows += 1;
                    Ok(())
                }
            },
            Err(err) => Err(err),
        }
    }

    fn finish(self) -> Result<LoadedDataset, LoadError> {
        let dataset = Dataset::from_records(self.records).ok_or(LoadError::Empty)?;
        Ok(LoadedDataset {
            dataset,
            report: self.report,
        })
    }
}

// ---------------------------------------------------------------------------
// JSON loaders
// ---------------------------------------------------------------------------

/// Records-oriented JSON (the default `df.to_json(orient='records')` shape).
fn load_json(path: &Path, rows: &mut RowCollector) -> Result<(), LoadError> {
    let root: JsonValue = serde_json::from_reader(BufReader::new(open(path)?))?;
    let JsonValue::Array(items) = root else {
        return Err(LoadError::Layout("expected a top-level JSON array".to_string()));
    };

    for item in items {
        let row = rows.next_row();
        rows.push(json_row(item, row))?;
    }
    Ok(())
}

/// One JSON object per line; blank lines are ignored.
fn load_json_lines(path: &Path, rows: &mut RowCollector) -> Result<(), LoadError> {
    let reader = BufReader::new(open(path)?);
    for line in reader.lines() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(&line)?;
        let row = rows.next_row();
        rows.push(json_row(value, row))?;
    }
    Ok(())
}

fn json_row(value: JsonValue, row: usize) -> Result<RawRecord, LoadError> {
    if !value.is_object() {
        return Err(invalid(row, "record", "not a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| invalid(row, "record", e.to_string()))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, rows: &mut RowCollector) -> Result<(), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(open(path)?);

    let headers = reader.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .into_iter()
        .find(|col| !headers.iter().any(|h| h == *col))
    {
        return Err(LoadError::MissingColumn {
            column: missing,
            format: "CSV header",
        });
    }

    // Cells stay text until coercion so ids like `0042` keep their digits.
    for result in reader.records() {
        let record = result?;
        rows.push(Ok(csv_row(&headers, &record)))?;
    }
    Ok(())
}

fn csv_row(headers: &csv::StringRecord, record: &csv::StringRecord) -> RawRecord {
    let cell = |name: &str| {
        let idx = headers.iter().position(|h| h == name)?;
        record
            .get(idx)
            .filter(|s| !s.is_empty())
            .map(|s| CellValue::Text(s.to_string()))
    };

    RawRecord {
        invoice_no: cell("invoice_no"),
        invoice_date: cell("invoice_date"),
        category: cell("category"),
        shopping_mall: cell("shopping_mall"),
        gender: cell("gender"),
        payment_method: cell("payment_method"),
        age: cell("age"),
        quantity: cell("quantity"),
        total_price: cell("total_price"),
        customer_id: cell("customer_id"),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, rows: &mut RowCollector) -> Result<(), LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;
    if let Some(missing) = REQUIRED_COLUMNS
        .into_iter()
        .find(|col| builder.schema().index_of(col).is_err())
    {
        return Err(LoadError::MissingColumn {
            column: missing,
            format: "Parquet schema",
        });
    }
    let reader = builder.build()?;

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let column = |name: &'static str| -> Result<ArrayRef, LoadError> {
            let idx = schema
                .index_of(name)
                .map_err(|_| LoadError::MissingColumn {
                    column: name,
                    format: "Parquet schema",
                })?;
            Ok(batch.column(idx).clone())
        };

        let invoice_no = schema
            .index_of("invoice_no")
            .ok()
            .map(|idx| batch.column(idx).clone());
        let invoice_date = column("invoice_date")?;
        let category = column("category")?;
        let shopping_mall = column("shopping_mall")?;
        let gender = column("gender")?;
        let payment_method = column("payment_method")?;
        let age = column("age")?;
        let quantity = column("quantity")?;
        let total_price = column("total_price")?;
        let customer_id = column("customer_id")?;

        for row in 0..batch.num_rows() {
            let raw = RawRecord {
                invoice_no: invoice_no.as_ref().and_then(|col| extract_cell(col, row)),
                invoice_date: extract_cell(&invoice_date, row),
                category: extract_cell(&category, row),
                shopping_mall: extract_cell(&shopping_mall, row),
                gender: extract_cell(&gender, row),
                payment_method: extract_cell(&payment_method, row),
                age: extract_cell(&age, row),
                quantity: extract_cell(&quantity, row),
                total_price: extract_cell(&total_price, row),
                customer_id: extract_cell(&customer_id, row),
            };
            rows.push(Ok(raw))?;
        }
    }
    Ok(())
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Option<CellValue> {
    if col.is_null(row) {
        return None;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => CellValue::Date(col.as_primitive::<Date32Type>().value_as_date(row)?),
        DataType::Date64 => CellValue::Date(col.as_primitive::<Date64Type>().value_as_date(row)?),
        // Pandas writes parsed dates as timestamps; only the day matters.
        DataType::Timestamp(unit, _) => CellValue::Date(timestamp_date(col, *unit, row)?),
        // Anything else goes through Arrow's display formatting and is
        // coerced like text.
        _ => CellValue::Text(array_value_to_string(col, row).ok()?),
    };
    Some(cell)
}

fn timestamp_date(col: &ArrayRef, unit: TimeUnit, row: usize) -> Option<NaiveDate> {
    let datetime = match unit {
        TimeUnit::Second => col.as_primitive::<TimestampSecondType>().value_as_datetime(row),
        TimeUnit::Millisecond => {
            col.as_primitive::<TimestampMillisecondType>().value_as_datetime(row)
        }
        TimeUnit::Microsecond => {
            col.as_primitive::<TimestampMicrosecondType>().value_as_datetime(row)
        }
        TimeUnit::Nanosecond => {
            col.as_primitive::<TimestampNanosecondType>().value_as_datetime(row)
        }
    };
    datetime.map(|dt| dt.date())
}
