//! Whitespace-delimited text table backing the result cache.
//!
//! Rows are written tab-separated under a header row. Program identities
//! containing whitespace are double-quoted with `\` escapes. Files written
//! by older tooling may carry an unnamed leading index column, announced
//! by a header line that starts with a separator; that column is dropped.
//! Every row must have exactly the header's width.

use super::record::{CacheRecord, CacheSchema, PROGRAM_COLUMN, VALUE_COLUMN};
use crate::error::{OptimizerError, Result};
use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Load every record from `path`.
///
/// A missing file, or one with nothing but whitespace, is an empty cache.
pub fn read_records(path: &Path, schema: &CacheSchema) -> Result<Vec<CacheRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(OptimizerError::io(path, e)),
    };

    let malformed = |line: usize, reason: String| OptimizerError::CacheFormat {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let indexed = header.starts_with(char::is_whitespace);
    let header = tokenize(header).map_err(|reason| malformed(header_line, reason))?;
    let width = header.len() + usize::from(indexed);

    let program_idx = column_index(&header, PROGRAM_COLUMN)
        .ok_or_else(|| malformed(header_line, format!("missing '{PROGRAM_COLUMN}' column")))?;
    let value_idx = column_index(&header, VALUE_COLUMN)
        .ok_or_else(|| malformed(header_line, format!("missing '{VALUE_COLUMN}' column")))?;
    let parameter_columns: Vec<(usize, &str)> = header
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != program_idx && i != value_idx)
        .map(|(i, name)| (i, name.as_str()))
        .collect();

    if !schema.accepts(parameter_columns.iter().map(|&(_, name)| name)) {
        return Err(schema.mismatch(parameter_columns.iter().map(|&(_, name)| name)));
    }

    let mut records = Vec::new();
    for (line_no, line) in lines {
        let mut row = tokenize(line).map_err(|reason| malformed(line_no, reason))?;
        if row.len() != width {
            return Err(malformed(
                line_no,
                format!("expected {width} columns, found {}", row.len()),
            ));
        }
        if indexed {
            row.remove(0);
        }

        let number = |idx: usize| -> Result<f64> {
            row[idx].parse::<f64>().map_err(|_| {
                malformed(
                    line_no,
                    format!("'{}' in column '{}' is not a number", row[idx], header[idx]),
                )
            })
        };

        let mut by_name: IndexMap<String, f64> = IndexMap::with_capacity(parameter_columns.len());
        for &(idx, name) in &parameter_columns {
            by_name.insert(name.to_string(), number(idx)?);
        }
        // lay the columns out in declared order
        let parameter_values = schema
            .parameters()
            .iter()
            .filter_map(|name| by_name.get(name).map(|&v| (name.clone(), v)))
            .collect();

        records.push(CacheRecord {
            program: row[program_idx].clone(),
            parameter_values,
            value: number(value_idx)?,
        });
    }

    Ok(records)
}

/// Replace `path` with the full record set.
///
/// The table goes to a sibling temporary file first and is renamed into
/// place, so an interrupted write leaves the previous cache intact.
pub fn write_records(path: &Path, schema: &CacheSchema, records: &[CacheRecord]) -> Result<()> {
    let text = render(schema, records);
    let tmp = temporary_path(path);
    fs::write(&tmp, text).map_err(|e| OptimizerError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| OptimizerError::io(path, e))
}

pub fn render(schema: &CacheSchema, records: &[CacheRecord]) -> String {
    let mut text = schema.columns().join("\t");
    text.push('\n');

    for record in records {
        let mut row = vec![quote(&record.program)];
        for name in schema.parameters() {
            let value = record.parameter_values.get(name).copied().unwrap_or(f64::NAN);
            row.push(format!("{value:?}"));
        }
        row.push(format!("{:?}", record.value));
        text.push_str(&row.join("\t"));
        text.push('\n');
    }

    text
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn column_index(header: &[String], column: &str) -> Option<usize> {
    header.iter().position(|name| name == column)
}

fn quote(field: &str) -> String {
    let needs_quotes =
        field.is_empty() || field.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return field.to_string();
    }

    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err("dangling escape".into()),
                        },
                        Some(other) => current.push(other),
                        None => return Err("unterminated quote".into()),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParameterSpec;

    fn schema() -> CacheSchema {
        CacheSchema::new(vec!["a".into(), "b".into()]).unwrap()
    }

    fn record(program: &str, a: f64, b: f64, value: f64) -> CacheRecord {
        CacheRecord::new(
            &schema(),
            program,
            &[ParameterSpec::new("a", 0.0, 1.0, a), ParameterSpec::new("b", 0.0, 1.0, b)],
            value,
        )
        .unwrap()
    }

    #[test]
    fn tokenizer_handles_quotes() {
        assert_eq!(tokenize("a  b\tc").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(
            tokenize(r#""./run model.sh \"x\"" 1.5"#).unwrap(),
            vec![r#"./run model.sh "x""#, "1.5"]
        );
        assert_eq!(tokenize(r#""" 2"#).unwrap(), vec!["", "2"]);
        assert!(tokenize(r#""open"#).is_err());
    }

    #[test]
    fn rendered_table_reads_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");
        let records = vec![
            record("./model --fast", 0.1, 1.0 / 3.0, 2.5e-300),
            record("./model", 1e-12, 0.7, -4.0),
        ];

        write_records(&path, &schema(), &records).unwrap();
        assert_eq!(read_records(&path, &schema()).unwrap(), records);
        assert!(!temporary_path(&path).exists());
    }

    #[test]
    fn missing_and_blank_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");
        assert!(read_records(&path, &schema()).unwrap().is_empty());

        fs::write(&path, "\n  \n").unwrap();
        assert!(read_records(&path, &schema()).unwrap().is_empty());

        fs::write(&path, "program\ta\tb\tvalue\n").unwrap();
        assert!(read_records(&path, &schema()).unwrap().is_empty());
    }

    #[test]
    fn columns_may_be_reordered_and_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");
        fs::write(&path, "\tprogram\tb\tvalue\ta\n0\t./model\t0.2\t9.5\t0.1\n").unwrap();

        let records = read_records(&path, &schema()).unwrap();
        assert_eq!(records, vec![record("./model", 0.1, 0.2, 9.5)]);
    }

    #[test]
    fn unquoted_program_with_spaces_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");
        fs::write(&path, "program\ta\tb\tvalue\n./run model.sh\t1.0\t2.0\t5.0\n").unwrap();

        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheFormat { line: 2, .. })
        ));
    }

    #[test]
    fn foreign_columns_are_a_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");
        fs::write(&path, "program a c value\n./model 1 2 3\n").unwrap();

        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheSchemaMismatch { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tsv");

        fs::write(&path, "program a b value\n./model 1 2\n").unwrap();
        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheFormat { line: 2, .. })
        ));

        fs::write(&path, "program a b value\n./model 1 two 3\n").unwrap();
        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheFormat { line: 2, .. })
        ));

        fs::write(&path, "program a b value\n0 ./model 1 2 3\n").unwrap();
        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheFormat { line: 2, .. })
        ));

        fs::write(&path, "a b value\n1 2 3\n").unwrap();
        assert!(matches!(
            read_records(&path, &schema()),
            Err(OptimizerError::CacheFormat { line: 1, .. })
        ));
    }
}
