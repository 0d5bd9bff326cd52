//! CSV decoding and validation of uploaded equipment tables.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use tracing::{debug, instrument};

use super::{
    has_csv_suffix, Row, FLOWRATE_COLUMN, PRESSURE_COLUMN, REQUIRED_COLUMNS, TEMPERATURE_COLUMN,
    TYPE_COLUMN,
};
use crate::logging::truncate_field;
use crate::prelude::*;

/// Options for decoding uploaded CSV tables.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Maximum records to read for schema inference (`None` reads them all)
    pub schema_infer_max_records: Option<usize>,
    /// Rows decoded per record batch
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            schema_infer_max_records: None,
            batch_size: 8192,
        }
    }
}

impl CsvOptions {
    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the batch size used while decoding.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn format(&self) -> Format {
        Format::default()
            .with_header(true)
            .with_delimiter(self.delimiter)
            .with_quote(self.quote)
    }
}

/// Parses raw upload bytes into typed [`Row`]s.
///
/// Validation is all-or-nothing: a table that is ragged, undecodable, lacks
/// a required column, or has a missing or non-numeric value in a required
/// column is rejected as a whole.
///
/// # Examples
///
/// ```rust
/// use fleet_guard::ingest::TableValidator;
///
/// let csv = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP-1,Pump,120.5,5.2,110.0\n";
/// let rows = TableValidator::new().validate(csv, "pumps.csv").unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].equipment_type, "Pump");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableValidator {
    options: CsvOptions,
}

impl TableValidator {
    /// Creates a validator with default CSV options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator with custom CSV options.
    pub fn with_options(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Returns the CSV options in use.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Validates an upload and decodes it into rows.
    ///
    /// # Errors
    ///
    /// * [`FleetError::BadExtension`] if `declared_name` does not end in `.csv`;
    ///   checked before any byte is parsed.
    /// * [`FleetError::ParseFailure`] if the bytes are not a rectangular CSV
    ///   table with the required columns and complete numeric values.
    #[instrument(skip(self, raw), fields(
        file_name = %truncate_field(declared_name, 128),
        bytes = raw.len()
    ))]
    pub fn validate(&self, raw: &[u8], declared_name: &str) -> Result<Vec<Row>> {
        if !has_csv_suffix(declared_name) {
            debug!("rejecting upload with unrecognized suffix");
            return Err(FleetError::BadExtension {
                file_name: declared_name.to_string(),
            });
        }

        let schema = self.infer_schema(raw)?;
        check_required_columns(&schema)?;

        let reader = ReaderBuilder::new(Arc::new(schema))
            .with_format(self.options.format())
            .with_batch_size(self.options.batch_size)
            .build(Cursor::new(raw))
            .parse_context("cannot open CSV reader")?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.parse_context("malformed CSV")?;
            // Data lines are 1-based and follow the header line.
            let first_line = rows.len() + 2;
            rows.extend(rows_from_batch(&batch, first_line)?);
        }

        debug!(rows = rows.len(), "table validated");
        Ok(rows)
    }

    fn infer_schema(&self, raw: &[u8]) -> Result<Schema> {
        let (schema, _) = self
            .options
            .format()
            .infer_schema(Cursor::new(raw), self.options.schema_infer_max_records)
            .parse_context("malformed CSV")?;
        Ok(type_column_as_text(schema))
    }
}

/// Reads the `Type` column as raw text whatever inference guessed, so labels
/// such as `007`, `1.50` or `TRUE` reach the distribution untouched.
fn type_column_as_text(schema: Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            let field = field.as_ref().clone();
            if field.name() == TYPE_COLUMN {
                field.with_data_type(DataType::Utf8)
            } else {
                field
            }
        })
        .collect();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}

fn check_required_columns(schema: &Schema) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| schema.index_of(name).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FleetError::parse_failure(format!(
            "missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

fn rows_from_batch(batch: &RecordBatch, first_line: usize) -> Result<Vec<Row>> {
    let flowrate = numeric_column(batch, FLOWRATE_COLUMN, first_line)?;
    let pressure = numeric_column(batch, PRESSURE_COLUMN, first_line)?;
    let temperature = numeric_column(batch, TEMPERATURE_COLUMN, first_line)?;
    let types = required_column(batch, TYPE_COLUMN, &DataType::Utf8, first_line)?;

    let flowrate = flowrate.as_primitive::<Float64Type>();
    let pressure = pressure.as_primitive::<Float64Type>();
    let temperature = temperature.as_primitive::<Float64Type>();
    let types = types.as_string::<i32>();

    Ok((0..batch.num_rows())
        .map(|i| Row {
            flowrate: flowrate.value(i),
            pressure: pressure.value(i),
            temperature: temperature.value(i),
            equipment_type: types.value(i).to_string(),
        })
        .collect())
}

fn numeric_column(batch: &RecordBatch, name: &str, first_line: usize) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| FleetError::parse_failure(format!("missing required column(s): {name}")))?;

    match column.data_type() {
        DataType::Utf8 | DataType::Null => {}
        data_type if data_type.is_numeric() => {}
        other => {
            return Err(FleetError::parse_failure(format!(
                "column '{name}' must be numeric, found {other}"
            )))
        }
    }

    required_column(batch, name, &DataType::Float64, first_line)
}

fn required_column(
    batch: &RecordBatch,
    name: &str,
    target: &DataType,
    first_line: usize,
) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| FleetError::parse_failure(format!("missing required column(s): {name}")))?;

    // A strict cast turns "abc" in a numeric column into an error instead of a null.
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let cast = cast_with_options(column, target, &options)
        .with_parse_context(|| format!("column '{name}' has a value that is not {target}"))?;

    if cast.null_count() > 0 {
        let line = (0..cast.len())
            .find(|&i| cast.is_null(i))
            .map(|i| i + first_line)
            .unwrap_or(first_line);
        return Err(FleetError::parse_failure(format!(
            "column '{name}' has a missing value on line {line}"
        )));
    }

    Ok(cast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn validate(csv: &str) -> Result<Vec<Row>> {
        TableValidator::new().validate(csv.as_bytes(), "readings.csv")
    }

    #[test]
    fn test_valid_table() {
        let rows = validate(
            "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
             Pump-1,Pump,120.5,5.2,110.0\n\
             Valve-1,Valve,60,4.1,105\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], Row::new(120.5, 5.2, 110.0, "Pump"));
        assert_eq!(rows[1], Row::new(60.0, 4.1, 105.0, "Valve"));
    }

    #[test]
    fn test_bad_extension_checked_before_parsing() {
        // Garbage bytes would be a parse failure; the suffix check wins.
        let err = TableValidator::new()
            .validate(&[0xff, 0xfe, 0x00], "data.txt")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadExtension);
    }

    #[test]
    fn test_missing_required_column() {
        let err = validate("Type,Flowrate,Pressure\nPump,1,2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("Temperature"), "{err}");
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let err = validate("type,flowrate,pressure,temperature\nPump,1,2,3\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_ragged_table_rejected() {
        let err = validate("Type,Flowrate,Pressure,Temperature\nPump,1,2,3\nValve,1,2\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = validate("Type,Flowrate,Pressure,Temperature\nPump,1,high,3\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("Pressure"), "{err}");
    }

    #[test]
    fn test_missing_value_rejected_with_line() {
        let err = validate("Type,Flowrate,Pressure,Temperature\nPump,1,2,3\nValve,1,,3\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn test_header_only_table_is_empty() {
        let rows = validate("Type,Flowrate,Pressure,Temperature\n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let err = validate("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_numeric_type_labels_kept_as_text() {
        let rows = validate("Type,Flowrate,Pressure,Temperature\n7,1,2,3\n7,1,2,3\n").unwrap();
        assert_eq!(rows[0].equipment_type, "7");
    }

    #[test]
    fn test_type_labels_keep_their_exact_text() {
        let rows = validate(
            "Type,Flowrate,Pressure,Temperature\n\
             007,1,2,3\n\
             7,1,2,3\n\
             1.50,1,2,3\n\
             1.5,1,2,3\n",
        )
        .unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.equipment_type.as_str()).collect();
        assert_eq!(labels, vec!["007", "7", "1.50", "1.5"]);
    }

    #[test]
    fn test_boolean_looking_labels_stay_distinct() {
        let rows = validate("Type,Flowrate,Pressure,Temperature\nTRUE,1,2,3\ntrue,1,2,3\n").unwrap();
        assert_eq!(rows[0].equipment_type, "TRUE");
        assert_eq!(rows[1].equipment_type, "true");

        let stats = crate::analyzers::StatisticsAggregator::new().aggregate(&rows);
        assert_eq!(stats.type_distribution.get("TRUE"), Some(1));
        assert_eq!(stats.type_distribution.get("true"), Some(1));
    }

    #[test]
    fn test_rows_span_multiple_batches() {
        let mut csv = String::from("Type,Flowrate,Pressure,Temperature\n");
        for i in 0..10 {
            csv.push_str(&format!("Pump,{i},2,3\n"));
        }
        let validator = TableValidator::with_options(CsvOptions::default().with_batch_size(3));
        let rows = validator.validate(csv.as_bytes(), "many.csv").unwrap();

        assert_eq!(rows.len(), 10);
        assert_eq!(rows[9].flowrate, 9.0);
    }

    #[test]
    fn test_missing_value_line_in_later_batch() {
        let mut csv = String::from("Type,Flowrate,Pressure,Temperature\n");
        for _ in 0..4 {
            csv.push_str("Pump,1,2,3\n");
        }
        csv.push_str("Pump,1,2,\n");
        let validator = TableValidator::with_options(CsvOptions::default().with_batch_size(2));
        let err = validator.validate(csv.as_bytes(), "gap.csv").unwrap_err();

        assert!(err.to_string().contains("line 6"), "{err}");
    }

    #[test]
    fn test_custom_delimiter() {
        let validator = TableValidator::with_options(CsvOptions::default().with_delimiter(b';'));
        let rows = validator
            .validate(b"Type;Flowrate;Pressure;Temperature\nPump;1.5;2;3\n", "semi.csv")
            .unwrap();
        assert_eq!(rows[0].flowrate, 1.5);
    }
}
