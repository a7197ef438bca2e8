//! Rendering finished datasets as table, JSON or text
//!
//! Every command produces a [`Dataset`]: header names plus rows of strings.
//! Rows narrower than the header are padded with empty strings and wider
//! ones are truncated. With no headers at all, `column_1..column_N` are
//! generated from the widest row.

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde_json::{Map, Value};
use std::io::Write;

/// Tabular command result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    /// Values of one column, in row order.
    pub fn column(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or_default())
            .collect()
    }
}

/// Write `data` to `writer` in the requested format.
pub fn write_dataset<W: Write>(writer: &mut W, format: OutputFormat, data: &Dataset) -> Result<()> {
    let headers = normalize_headers(&data.headers, &data.rows);
    let rows = normalize_rows(&data.rows, headers.len());

    match format {
        OutputFormat::Table => write_table(writer, &headers, &rows),
        OutputFormat::Json => write_json(writer, &headers, &rows),
        OutputFormat::Text => write_text(writer, &headers, &rows),
    }
    .context("write output")
}

fn normalize_headers(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    if !headers.is_empty() {
        return headers.to_vec();
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (1..=width).map(|i| format!("column_{i}")).collect()
}

fn normalize_rows(rows: &[Vec<String>], width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut row: Vec<String> = row.iter().take(width).cloned().collect();
            row.resize(width, String::new());
            row
        })
        .collect()
}

fn write_table<W: Write>(writer: &mut W, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    if headers.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    for row in rows {
        table.add_row(row);
    }

    writeln!(writer, "{table}")?;
    Ok(())
}

fn write_json<W: Write>(writer: &mut W, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let record: Map<String, Value> = headers
                .iter()
                .zip(row)
                .map(|(h, v)| (h.clone(), Value::String(v.clone())))
                .collect();
            Value::Object(record)
        })
        .collect();

    serde_json::to_writer_pretty(&mut *writer, &records)?;
    writeln!(writer)?;
    Ok(())
}

fn write_text<W: Write>(writer: &mut W, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    if headers.is_empty() {
        return Ok(());
    }

    for row in rows {
        let line = if headers.len() == 1 {
            row[0].clone()
        } else {
            headers
                .iter()
                .zip(row)
                .map(|(h, v)| format!("{h}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
