use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::filter::City;
use super::model::{CellValue, Column, TripRecord, TripTable};

/// Extensions tried, in order, when looking for a city's source file.
pub const SOURCE_EXTENSIONS: [&str; 3] = ["csv", "parquet", "json"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Find the source file for `city` inside `data_dir`.
pub fn resolve_source(data_dir: &Path, city: City) -> Result<PathBuf> {
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| data_dir.join(format!("{}.{ext}", city.source_stem())))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            let tried = SOURCE_EXTENSIONS
                .map(|ext| format!("{}.{ext}", city.source_stem()))
                .join(", ");
            DataError::unavailable(
                data_dir,
                anyhow::anyhow!("no data file for {city} (tried {tried})"),
            )
        })
}

/// Load every trip recorded for `city`.
pub fn load_city(data_dir: &Path, city: City) -> Result<TripTable> {
    let path = resolve_source(data_dir, city)?;
    let table = load_file(&path)?;
    log::info!(
        "Loaded {} trips for {city} from {} (columns {:?})",
        table.len(),
        path.display(),
        table.columns()
    );
    Ok(table)
}

/// Load a trip table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row; a leading unnamed index column is kept as the id
/// * `.parquet` – string or timestamp time columns, numeric duration / birth year
/// * `.json`    – `[{ "Start Time": "...", "Start Station": "...", ... }, ...]`
pub fn load_file(path: &Path) -> Result<TripTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => Err(DataError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Shared row handling
// ---------------------------------------------------------------------------

/// Names a source might give its leading index column.
fn is_index_header(name: &str) -> bool {
    let name = name.trim();
    name.is_empty()
        || name.starts_with("Unnamed")
        || name.eq_ignore_ascii_case("id")
        || name.eq_ignore_ascii_case("index")
}

/// Work out which known columns a source carries and make sure the required
/// ones are among them.
fn schema_from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<BTreeSet<Column>> {
    let mut columns = BTreeSet::new();
    for header in headers {
        match Column::from_header(header) {
            Some(column) => {
                columns.insert(column);
            }
            None if is_index_header(header) => {}
            None => log::debug!("Ignoring unknown column '{header}'"),
        }
    }
    if let Some(column) = Column::REQUIRED.into_iter().find(|c| !columns.contains(c)) {
        return Err(DataError::MissingColumn { column });
    }
    Ok(columns)
}

/// Turn one row's cells into a trip. Only an unusable start time is an
/// error; every other empty cell becomes an absent value.
fn build_record(
    row: usize,
    id: Option<String>,
    cell: impl Fn(Column) -> CellValue,
) -> Result<TripRecord> {
    let raw_start = cell(Column::StartTime);
    let start_time = raw_start.as_timestamp().ok_or_else(|| DataError::InvalidRecord {
        row,
        message: format!("unparsable start time '{raw_start}'"),
    })?;

    let mut record = TripRecord::new(
        start_time,
        cell(Column::StartStation).as_text().unwrap_or_default(),
        cell(Column::EndStation).as_text().unwrap_or_default(),
    );
    record.id = id;
    record.end_time = cell(Column::EndTime).as_timestamp();
    record.duration = cell(Column::TripDuration).as_f64();
    record.user_type = cell(Column::UserType).as_text();
    record.gender = cell(Column::Gender).as_text();
    record.birth_year = cell(Column::BirthYear).as_year();
    Ok(record)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the column names written by the bikeshare
/// exports, e.g. `,Start Time,End Time,Trip Duration,Start Station,...`.
/// Unknown columns are ignored.
fn load_csv(path: &Path) -> Result<TripTable> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::unavailable(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::unavailable(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let columns = schema_from_headers(headers.iter().map(String::as_str))?;
    let positions: BTreeMap<Column, usize> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| Column::from_header(h).map(|c| (c, i)))
        .collect();
    let id_idx = headers.iter().position(|h| is_index_header(h));

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::unavailable(path, e))?;
        let id = id_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let trip = build_record(row_no, id, |column| {
            positions
                .get(&column)
                .and_then(|&i| record.get(i))
                .map(text_cell)
                .unwrap_or(CellValue::Null)
        })?;
        records.push(trip);
    }

    Ok(TripTable::new(records, columns))
}

/// CSV cells stay text; each field reads them as it needs, so station names
/// like `0042` survive unchanged.
fn text_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "Start Time": "2017-01-01 09:07:57",
///     "Trip Duration": 776,
///     "Start Station": "Canal St & Adams St",
///     "End Station": "Ashland Ave & Division St",
///     "User Type": "Subscriber"
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<TripTable> {
    let text = std::fs::read_to_string(path).map_err(|e| DataError::unavailable(path, e))?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| DataError::unavailable(path, e))?;

    let rows = root.as_array().ok_or_else(|| DataError::InvalidRecord {
        row: 0,
        message: "expected a top-level JSON array".to_string(),
    })?;

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for (i, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| DataError::InvalidRecord {
            row: i,
            message: "not a JSON object".to_string(),
        })?;
        keys.extend(obj.keys().map(String::as_str));
    }
    let columns = schema_from_headers(keys.iter().copied())?;
    let id_key = keys.iter().copied().find(|k| is_index_header(k));

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        // Checked to be an object above.
        let Some(obj) = row.as_object() else { continue };
        let id = id_key
            .and_then(|k| obj.get(k))
            .map(json_to_cell)
            .and_then(|c| c.as_text());
        let trip = build_record(i, id, |column| {
            obj.get(column.header())
                .map(json_to_cell)
                .unwrap_or(CellValue::Null)
        })?;
        records.push(trip);
    }

    Ok(TripTable::new(records, columns))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of trips.
///
/// Column names match the CSV headers. Time columns may be strings or Arrow
/// timestamps of any unit; numeric columns may be integer or float.
fn load_parquet(path: &Path) -> Result<TripTable> {
    let file = std::fs::File::open(path).map_err(|e| DataError::unavailable(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| DataError::unavailable(path, e))?;
    let columns = schema_from_headers(builder.schema().fields().iter().map(|f| f.name().as_str()))?;
    let reader = builder.build().map_err(|e| DataError::unavailable(path, e))?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| DataError::unavailable(path, e))?;
        let schema = batch.schema();

        let positions: BTreeMap<Column, usize> = columns
            .iter()
            .filter_map(|&c| schema.index_of(c.header()).ok().map(|i| (c, i)))
            .collect();
        let id_idx = schema
            .fields()
            .iter()
            .position(|f| is_index_header(f.name()));

        for row in 0..batch.num_rows() {
            let id = id_idx
                .map(|i| extract_cell(batch.column(i), row))
                .and_then(|c| c.as_text());
            let trip = build_record(records.len(), id, |column| {
                positions
                    .get(&column)
                    .map(|&i| extract_cell(batch.column(i), row))
                    .unwrap_or(CellValue::Null)
            })?;
            records.push(trip);
        }
    }

    Ok(TripTable::new(records, columns))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    let cell = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => Some(CellValue::String(col.as_string::<i64>().value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Timestamp(unit, _) => {
            let ts = match unit {
                TimeUnit::Second => any
                    .downcast_ref::<TimestampSecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Millisecond => any
                    .downcast_ref::<TimestampMillisecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Microsecond => any
                    .downcast_ref::<TimestampMicrosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
                TimeUnit::Nanosecond => any
                    .downcast_ref::<TimestampNanosecondArray>()
                    .and_then(|a| a.value_as_datetime(row)),
            };
            ts.map(CellValue::Timestamp)
        }
        other => {
            log::warn!("Unsupported parquet column type {other:?}, treating as missing");
            None
        }
    };
    cell.unwrap_or(CellValue::Null)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use chrono::Weekday;
    use parquet::arrow::ArrowWriter;

    use super::*;

    const CHICAGO_CSV: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
1423854,2017-06-23 15:09:32,2017-06-23 15:14:53,321,Wood St & Hubbard St,Damen Ave & Chicago Ave,Subscriber,Male,1992.0
955915,2017-05-25 18:19:03,2017-05-25 18:45:53,1610,Theater on the Lake,Sheffield Ave & Waveland Ave,Subscriber,Female,1992.0
9031,2017-01-04 08:27:49,2017-01-04 08:34:45,416,May St & Taylor St,Wood St & Taylor St,Customer,,
";

    const WASHINGTON_CSV: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type
1621326,2017-06-21 08:36:34,2017-06-21 08:44:43,489.066,14th & Belmont St NW,15th & K St NW,Subscriber
482740,2017-03-11 10:40:00,2017-03-11 10:46:00,402.549,Yuma St & Tenley Circle NW,Connecticut Ave & Yuma St NW,Subscriber
";

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_csv_with_index_column_and_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "chicago.csv", CHICAGO_CSV);

        let table = load_city(dir.path(), City::Chicago).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.has_column(Column::Gender));
        assert!(table.has_column(Column::BirthYear));

        let first = &table.records()[0];
        assert_eq!(first.id.as_deref(), Some("1423854"));
        assert_eq!(first.month(), 6);
        assert_eq!(first.weekday(), Weekday::Fri);
        assert_eq!(first.start_hour(), 15);
        assert_eq!(first.duration, Some(321.0));
        assert_eq!(first.birth_year, Some(1992));
        assert_eq!(first.gender.as_deref(), Some("Male"));

        let last = &table.records()[2];
        assert_eq!(last.gender, None);
        assert_eq!(last.birth_year, None);
        assert_eq!(last.user_type.as_deref(), Some("Customer"));
    }

    #[test]
    fn washington_schema_has_no_demographics() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "washington.csv", WASHINGTON_CSV);

        let table = load_city(dir.path(), City::Washington).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.has_column(Column::Gender));
        assert!(!table.has_column(Column::BirthYear));
        assert_eq!(table.records()[0].duration, Some(489.066));
    }

    #[test]
    fn missing_source_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_city(dir.path(), City::NewYorkCity).unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("new_york_city.csv"));
        match err {
            DataError::DataUnavailable { path, source } => {
                assert_eq!(path, dir.path());
                assert!(source.to_string().contains("new_york_city.parquet"));
            }
            other => panic!("expected DataUnavailable, got {other:?}"),
        }

        let err = load_file(&dir.path().join("gone.csv")).unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable { .. }));
    }

    #[test]
    fn numeric_looking_text_is_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "chicago.csv",
            "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
007,2017-03-01 09:00:00,2017-03-01 09:05:00,300,0042,1e3,Subscriber,Male,1985.0
",
        );

        let table = load_file(&path).unwrap();
        let trip = &table.records()[0];
        assert_eq!(trip.id.as_deref(), Some("007"));
        assert_eq!(trip.start_station, "0042");
        assert_eq!(trip.end_station, "1e3");
        assert_eq!(trip.duration, Some(300.0));
        assert_eq!(trip.birth_year, Some(1985));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "chicago.csv",
            "Start Time,Start Station\n2017-01-01 00:00:00,A\n",
        );
        let err = load_file(&path).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn {
                column: Column::EndStation
            }
        ));
    }

    #[test]
    fn bad_start_time_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "chicago.csv",
            "Start Time,Start Station,End Station\n2017-01-01 00:00:00,A,B\nyesterday,A,B\n",
        );
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, DataError::InvalidRecord { row: 1, .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("trips.xlsx")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat { .. }));
    }

    #[test]
    fn json_matches_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = write_file(dir.path(), "washington.csv", WASHINGTON_CSV);
        let json_path = write_file(
            dir.path(),
            "washington.json",
            r#"[
  {"Unnamed: 0": 1621326, "Start Time": "2017-06-21 08:36:34", "End Time": "2017-06-21 08:44:43",
   "Trip Duration": 489.066, "Start Station": "14th & Belmont St NW", "End Station": "15th & K St NW",
   "User Type": "Subscriber"},
  {"Unnamed: 0": 482740, "Start Time": "2017-03-11 10:40:00", "End Time": "2017-03-11 10:46:00",
   "Trip Duration": 402.549, "Start Station": "Yuma St & Tenley Circle NW",
   "End Station": "Connecticut Ave & Yuma St NW", "User Type": "Subscriber"}
]"#,
        );
        assert_eq!(load_file(&json_path).unwrap(), load_file(&csv_path).unwrap());
    }

    #[test]
    fn parquet_with_timestamp_column_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chicago.parquet");

        let start = crate::data::model::parse_timestamp("2017-02-14 07:30:00").unwrap();
        let micros = start.and_utc().timestamp_micros();

        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "Start Time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("Trip Duration", DataType::Float64, true),
            Field::new("Start Station", DataType::Utf8, false),
            Field::new("End Station", DataType::Utf8, false),
            Field::new("Birth Year", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMicrosecondArray::from(vec![micros])),
                Arc::new(Float64Array::from(vec![Some(90.5)])),
                Arc::new(StringArray::from(vec!["A"])),
                Arc::new(StringArray::from(vec!["B"])),
                Arc::new(Float64Array::from(vec![None::<f64>])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_city(dir.path(), City::Chicago).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.has_column(Column::BirthYear));
        assert!(!table.has_column(Column::Gender));

        let trip = &table.records()[0];
        assert_eq!(trip.start_time(), start);
        assert_eq!(trip.weekday(), Weekday::Tue);
        assert_eq!(trip.duration, Some(90.5));
        assert_eq!(trip.birth_year, None);
    }

    #[test]
    fn parquet_matches_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = write_file(dir.path(), "chicago.csv", CHICAGO_CSV);
        let parquet_path = dir.path().join("chicago.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("Start Time", DataType::Utf8, false),
            Field::new("End Time", DataType::Utf8, false),
            Field::new("Trip Duration", DataType::Float64, false),
            Field::new("Start Station", DataType::Utf8, false),
            Field::new("End Station", DataType::Utf8, false),
            Field::new("User Type", DataType::Utf8, false),
            Field::new("Gender", DataType::Utf8, true),
            Field::new("Birth Year", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1423854, 955915, 9031])),
                Arc::new(StringArray::from(vec![
                    "2017-06-23 15:09:32",
                    "2017-05-25 18:19:03",
                    "2017-01-04 08:27:49",
                ])),
                Arc::new(StringArray::from(vec![
                    "2017-06-23 15:14:53",
                    "2017-05-25 18:45:53",
                    "2017-01-04 08:34:45",
                ])),
                Arc::new(Float64Array::from(vec![321.0, 1610.0, 416.0])),
                Arc::new(StringArray::from(vec![
                    "Wood St & Hubbard St",
                    "Theater on the Lake",
                    "May St & Taylor St",
                ])),
                Arc::new(StringArray::from(vec![
                    "Damen Ave & Chicago Ave",
                    "Sheffield Ave & Waveland Ave",
                    "Wood St & Taylor St",
                ])),
                Arc::new(StringArray::from(vec!["Subscriber", "Subscriber", "Customer"])),
                Arc::new(StringArray::from(vec![Some("Male"), Some("Female"), None])),
                Arc::new(Float64Array::from(vec![Some(1992.0), Some(1992.0), None])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&parquet_path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let from_parquet = load_file(&parquet_path).unwrap();
        assert_eq!(from_parquet.len(), 3);
        assert_eq!(from_parquet, load_file(&csv_path).unwrap());
    }

    #[test]
    fn csv_is_preferred_over_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "washington.json", "[]");
        let csv_path = write_file(dir.path(), "washington.csv", WASHINGTON_CSV);
        assert_eq!(resolve_source(dir.path(), City::Washington).unwrap(), csv_path);
    }
}
