use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, Int8Array, LargeStringArray, StringArray, UInt16Array, UInt32Array, UInt8Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::clean::clean_table;
use super::model::{CellValue, RawTable, StationDataset};

/// Cell texts read as null, following the pandas `read_csv` defaults.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load and clean one station's source.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one observation per record (PRSA layout)
/// * `.json`    – `[{ "year": 2013, "month": 3, ..., "PM2.5": 4.0 }, ...]`
/// * `.parquet` – flat columns of ints, floats, strings or bools
pub fn load_file(location: &str, path: &Path) -> Result<StationDataset> {
    let table = read_table(path).with_context(|| format!("loading {}", path.display()))?;
    clean_table(location, table).with_context(|| format!("cleaning {}", path.display()))
}

/// Parse a source into an uncleaned table.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, e.g.
/// `No,year,month,day,hour,PM2.5,PM10,...,TEMP,PRES,DEWP,RAIN,wd,WSPM,station`.
/// Rows with fewer fields than the header are accepted; the gap is null.
fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable::new(columns, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => CellValue::Bool(true),
        "false" | "False" | "FALSE" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "year": 2013, "month": 3, "day": 1, "hour": 0, "PM2.5": 4.0, "wd": "NNW" },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys in first-seen order; a key missing from a
/// record is null for that row.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut objects = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            let key = key.trim();
            if !index.contains_key(key) {
                index.insert(key.to_string(), columns.len());
                columns.push(key.to_string());
            }
        }
        objects.push(obj);
    }

    let rows: Vec<Vec<CellValue>> = objects
        .into_iter()
        .map(|obj| {
            let mut row = vec![CellValue::Null; columns.len()];
            for (key, val) in obj {
                if let Some(&col) = index.get(key.trim()) {
                    row[col] = json_to_cell(val);
                }
            }
            row
        })
        .collect();

    Ok(RawTable::new(columns, rows))
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
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of station observations.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested columns are not supported and
/// come through as their type name.
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawTable::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| CellValue::String(a.value(row).to_string())),
        DataType::Int8 => any
            .downcast_ref::<Int8Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::Int16 => any
            .downcast_ref::<Int16Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::UInt8 => any
            .downcast_ref::<UInt8Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::UInt16 => any
            .downcast_ref::<UInt16Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::UInt32 => any
            .downcast_ref::<UInt32Array>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        other => Some(CellValue::String(format!("{other:?}"))),
    };
    value.unwrap_or(CellValue::Null)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use arrow::datatypes::{Field as ArrowField, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::TempDir;

    use super::*;
    use crate::data::model::Field;

    const PRSA_HEADER: &str =
        "No,year,month,day,hour,PM2.5,PM10,SO2,NO2,CO,O3,TEMP,PRES,DEWP,RAIN,wd,WSPM,station";

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_prsa_csv_and_drops_na_rows() {
        let dir = TempDir::new().unwrap();
        let csv = format!(
            "{PRSA_HEADER}\n\
             1,2013,3,1,0,4,4,4,7,300,77,-0.7,1023,-18.8,0,NNW,4.4,Aotizhongxin\n\
             2,2013,3,1,1,8,8,4,7,300,77,-1.1,1023.2,-18.2,0,N,4.7,Aotizhongxin\n\
             3,2013,3,1,2,NA,7,5,10,300,73,-1.1,1023.5,-18.2,0,NNW,5.6,Aotizhongxin\n\
             4,2013,3,1,3,6,6,11,11,300,72,-1.4,1024.5,-19.4,0,NW,3.1,Aotizhongxin\n\
             5,2013,3,1,4,3,3,12,12,300,72,-2,1025.2,-19.5,0,N,2,Aotizhongxin\n"
        );
        let path = write(&dir, "PRSA_Data_Aotizhongxin.csv", &csv);

        let ds = load_file("Aotizhongxin", &path).unwrap();

        assert_eq!(ds.location, "Aotizhongxin");
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.fields, vec![Field::Pm25, Field::Temp, Field::Wspm]);
        assert_eq!(ds.records[0].pm25, Some(4.0));
        assert_eq!(ds.records[0].temp, Some(-0.7));
        assert_eq!(
            ds.records[0].extra.get("wd"),
            Some(&CellValue::String("NNW".into()))
        );
        assert_eq!(ds.records[0].extra.get("PRES"), Some(&CellValue::Integer(1023)));
    }

    #[test]
    fn csv_headers_with_padding_are_normalised() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "padded.csv",
            " year , month,day ,hour, PM2.5 , HUMI\n2014,1,1,0,12.5,40\n",
        );

        let ds = load_file("Padded", &path).unwrap();

        assert_eq!(ds.columns, vec!["year", "month", "day", "hour", "PM2.5", "HUMI"]);
        assert_eq!(ds.records[0].humi, Some(40.0));
    }

    #[test]
    fn guesses_cell_types_like_pandas() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("NA"), CellValue::Null);
        assert_eq!(guess_cell_type("NaN"), CellValue::Null);
        assert_eq!(guess_cell_type("42"), CellValue::Integer(42));
        assert_eq!(guess_cell_type("4.5"), CellValue::Float(4.5));
        assert_eq!(guess_cell_type("True"), CellValue::Bool(true));
        assert_eq!(guess_cell_type("NNE"), CellValue::String("NNE".into()));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_file("Nowhere", &dir.path().join("missing.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("opening CSV"));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "data.xlsx", "");
        let err = load_file("Sheet", &path).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn csv_without_time_columns_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "no_time.csv", "PM2.5,TEMP\n1,2\n");
        let err = load_file("NoTime", &path).unwrap_err();
        assert!(format!("{err:#}").contains("'year'"));
    }

    #[test]
    fn loads_json_records() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "records.json",
            r#"[
                {"year": 2014, "month": 1, "day": 2, "hour": 5, "PM2.5": 80.0, "TEMP": -3, "station": "Dongsi"},
                {"year": 2014, "month": 1, "day": 2, "hour": 6, "PM2.5": null, "TEMP": -2},
                {"year": 2014, "month": 1, "day": 2, "hour": 7, "PM2.5": "91", "TEMP": -1}
            ]"#,
        );

        let ds = load_file("Dongsi", &path).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[1].pm25, Some(91.0));
        assert_eq!(ds.records[1].extra.get("station"), Some(&CellValue::Null));
    }

    #[test]
    fn json_that_is_not_an_array_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "object.json", r#"{"year": 2014}"#);
        assert!(load_file("Bad", &path).is_err());
    }

    #[test]
    fn loads_parquet_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("station.parquet");

        let schema = Arc::new(Schema::new(vec![
            ArrowField::new("year", DataType::Int64, false),
            ArrowField::new("month", DataType::Int64, false),
            ArrowField::new("day", DataType::Int64, false),
            ArrowField::new("hour", DataType::Int64, false),
            ArrowField::new("PM2.5", DataType::Float64, true),
            ArrowField::new("station", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![2015, 2015, 2015])),
                Arc::new(Int64Array::from(vec![6, 6, 6])),
                Arc::new(Int64Array::from(vec![1, 1, 1])),
                Arc::new(Int64Array::from(vec![0, 1, 2])),
                Arc::new(Float64Array::from(vec![Some(10.0), None, Some(30.0)])),
                Arc::new(StringArray::from(vec!["Guanyuan", "Guanyuan", "Guanyuan"])),
            ],
        )
        .unwrap();
        let file = fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file("Guanyuan", &path).unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.cleaning.rejected_missing, 1);
        assert_eq!(ds.records[1].pm25, Some(30.0));
        assert_eq!(
            ds.records[0].extra.get("station"),
            Some(&CellValue::String("Guanyuan".into()))
        );
    }
}
