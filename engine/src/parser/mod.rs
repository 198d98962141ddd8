//! Typed CSV reading and writing with encoding and delimiter auto-detection.
//!
//! Cells are parsed against a declared [`Schema`]; nothing is inferred.
//! Empty cells and `NA` are missing values.

use std::io::Write;

use crate::error::{DatasetError, DatasetResult, SchemaError};
use crate::models::{DataType, Schema, Table, Value};

/// Decoded file content with the settings that were detected for it.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub content: String,
    pub encoding: String,
    pub delimiter: u8,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding, lossy for UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Pick the delimiter that occurs most often in the header line.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = b',';
    let mut best_count = 0;
    for sep in [b',', b';', b'\t', b'|'] {
        let count = first_line.bytes().filter(|&b| b == sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Detect encoding and delimiter, then decode.
pub fn decode_bytes_auto(bytes: &[u8]) -> Decoded {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    Decoded {
        content,
        encoding,
        delimiter,
    }
}

/// Parse one cell as `dtype`. `None` if the text is not a valid `dtype`.
pub fn parse_cell(raw: &str, dtype: DataType) -> Option<Value> {
    let text = raw.trim();
    if text.is_empty() || text == "NA" {
        return Some(Value::Null);
    }
    match dtype {
        DataType::Int => text.parse::<i64>().ok().map(Value::Int),
        DataType::Float => text.parse::<f64>().ok().map(Value::Float),
        DataType::Bool => match text.to_ascii_uppercase().as_str() {
            "TRUE" | "T" | "Y" | "YES" => Some(Value::Bool(true)),
            "FALSE" | "F" | "N" | "NO" => Some(Value::Bool(false)),
            _ => None,
        },
        DataType::Str | DataType::Categorical => Some(Value::Str(text.to_string())),
    }
}

/// Read CSV text into a table with the given schema.
///
/// Every schema column must appear in the header (in any order); extra
/// file columns are ignored. Short records are padded with missing values.
pub fn read_table(content: &str, delimiter: u8, schema: &Schema) -> DatasetResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    let positions = schema
        .fields()
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|h| *h == field.name)
                .ok_or_else(|| SchemaError::MissingColumn {
                    column: field.name.clone(),
                    available: headers.clone(),
                })
        })
        .collect::<Result<Vec<usize>, SchemaError>>()?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, csv::Position::line);

        let mut row = Vec::with_capacity(schema.len());
        for (field, &pos) in schema.fields().iter().zip(&positions) {
            let raw = record.get(pos).unwrap_or("");
            let cell = parse_cell(raw, field.dtype).ok_or_else(|| DatasetError::InvalidValue {
                line,
                column: field.name.clone(),
                value: raw.to_string(),
                expected: field.dtype,
            })?;
            row.push(cell);
        }
        rows.push(row);
    }

    Ok(Table::new(schema.clone(), rows)?)
}

/// Read raw bytes of unknown encoding and delimiter.
pub fn read_table_auto(bytes: &[u8], schema: &Schema) -> DatasetResult<Table> {
    let decoded = decode_bytes_auto(bytes);
    tracing::debug!(
        encoding = %decoded.encoding,
        delimiter = %char::from(decoded.delimiter),
        "decoded csv"
    );
    read_table(&decoded.content, decoded.delimiter, schema)
}

fn csv_error(err: csv::Error) -> DatasetError {
    let line = err.position().map_or(0, csv::Position::line);
    DatasetError::Csv {
        line,
        message: err.to_string(),
    }
}

/// Write a table as comma-separated text with a header row.
///
/// Missing values are written as `NA`.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.schema().fields().iter().map(|f| f.name.as_str()))?;
    for row in table.rows() {
        out.write_record(row.iter().map(ToString::to_string))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_pairs(&[
            ("playerID", DataType::Str),
            ("yearID", DataType::Int),
            ("lgID", DataType::Categorical),
            ("BA", DataType::Float),
        ])
        .unwrap()
    }

    #[test]
    fn test_read_typed_table() {
        let csv = "playerID,yearID,lgID,BA\naaronha01,1957,NL,0.322\nmayswi01,1957,NL,NA\n";
        let table = read_table(csv, b',', &schema()).unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.value(0, "yearID").unwrap(), Some(&Value::Int(1957)));
        assert_eq!(table.value(0, "BA").unwrap(), Some(&Value::Float(0.322)));
        assert_eq!(table.value(1, "BA").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_header_order_and_extra_columns() {
        let csv = "BA;extra;lgID;yearID;playerID\n0.3;x;AL;1961;marisro01";
        let table = read_table(csv, b';', &schema()).unwrap();
        assert_eq!(table.column_names(), vec!["playerID", "yearID", "lgID", "BA"]);
        assert_eq!(table.value(0, "playerID").unwrap(), Some(&Value::from("marisro01")));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "playerID,yearID,lgID,BA\n\"ruth, babe\",1927,\"AL\",0.356";
        let table = read_table(csv, b',', &schema()).unwrap();
        assert_eq!(table.value(0, "playerID").unwrap(), Some(&Value::from("ruth, babe")));
    }

    #[test]
    fn test_short_rows_are_missing() {
        let csv = "playerID,yearID,lgID,BA\nx01,1990";
        let table = read_table(csv, b',', &schema()).unwrap();
        assert_eq!(table.value(0, "lgID").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_invalid_value_reports_line() {
        let csv = "playerID,yearID,lgID,BA\nx01,1990,AL,0.3\nx02,nineteen,AL,0.3";
        let err = read_table(csv, b',', &schema()).unwrap_err();
        match err {
            DatasetError::InvalidValue {
                line,
                column,
                value,
                expected,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "yearID");
                assert_eq!(value, "nineteen");
                assert_eq!(expected, DataType::Int);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_schema_column() {
        let err = read_table("playerID,yearID\nx,1", b',', &schema()).unwrap_err();
        assert!(matches!(err, DatasetError::Schema(SchemaError::MissingColumn { .. })));
    }

    #[test]
    fn test_parse_bool_cells() {
        assert_eq!(parse_cell("Y", DataType::Bool), Some(Value::Bool(true)));
        assert_eq!(parse_cell("false", DataType::Bool), Some(Value::Bool(false)));
        assert_eq!(parse_cell("", DataType::Bool), Some(Value::Null));
        assert_eq!(parse_cell("maybe", DataType::Bool), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_read_table_auto() {
        let csv = "playerID;yearID;lgID;BA\naaronha01;1957;NL;0.322";
        let table = read_table_auto(csv.as_bytes(), &schema()).unwrap();
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn test_write_csv() {
        let csv = "playerID,yearID,lgID,BA\naaronha01,1957,NL,0.322\nmayswi01,1957,NL,NA\n";
        let table = read_table(csv, b',', &schema()).unwrap();

        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), csv);
    }
}
