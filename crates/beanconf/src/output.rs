//! Output formatting helpers for the `beanconf` CLI.
//!
//! JSON output, simple tables, and human-readable bean display.

use std::io::{self, Write};

use serde::Serialize;

use beanconf_core::{Bean, BeanEvent, Schema};

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Column widths are computed from the data for alignment.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    for row in std::iter::once(&header).chain(std::iter::once(&separator)).chain(rows) {
        let _ = writeln!(handle, "{}", format_row(row, &widths));
    }
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = row
        .iter()
        .enumerate()
        .map(|(i, cell)| match widths.get(i) {
            Some(width) => format!("{:<width$}", cell, width = width),
            None => cell.clone(),
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}

/// Renders a value list: a single value as is, several as `[a, b]`.
pub fn format_values(values: &[String]) -> String {
    match values {
        [single] => single.clone(),
        _ => format!("[{}]", values.join(", ")),
    }
}

/// One-line summary of a bean's properties: `name=Homer age=39`.
pub fn format_bean_compact(bean: &Bean) -> String {
    bean.properties
        .iter()
        .map(|(name, values)| format!("{}={}", name, format_values(values)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line bean display, each line prefixed by `indent`.
///
/// ```text
/// Father/f1
///   name: Homer
///   friend -> Father/f2
/// ```
pub fn format_bean_details(bean: &Bean, indent: &str) -> String {
    let mut lines = vec![format!("{indent}{}", bean.id)];
    for (name, values) in &bean.properties {
        lines.push(format!("{indent}  {}: {}", name, format_values(values)));
    }
    for (name, targets) in &bean.references {
        let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
        lines.push(format!("{indent}  {} -> {}", name, format_values(&targets)));
    }
    lines.join("\n")
}

/// Multi-line schema display.
pub fn format_schema(schema: &Schema) -> String {
    let mut lines = vec![if schema.singleton {
        format!("{} (singleton)", schema.name)
    } else {
        schema.name.clone()
    }];
    if !schema.description.is_empty() {
        lines.push(format!("  {}", schema.description));
    }
    for p in &schema.properties {
        let mut line = format!("  {}: {}", p.name, p.property_type);
        if p.required {
            line.push_str(" required");
        }
        if let Some(min) = p.min {
            line.push_str(&format!(" min={min}"));
        }
        if let Some(max) = p.max {
            line.push_str(&format!(" max={max}"));
        }
        if let Some(default) = &p.default {
            line.push_str(&format!(" default={default}"));
        }
        lines.push(line);
    }
    for l in &schema.property_lists {
        let mut line = format!("  {}: [{}]", l.name, l.property_type);
        if l.required {
            line.push_str(" required");
        }
        lines.push(line);
    }
    for r in &schema.references {
        let target = if r.list {
            format!("[{}]", r.schema_name)
        } else {
            r.schema_name.clone()
        };
        let mut line = format!("  {} -> {}", r.name, target);
        if r.singleton {
            line.push_str(" singleton");
        }
        if r.required {
            line.push_str(" required");
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Table row for an audit event.
pub fn event_row(event: &BeanEvent) -> Vec<String> {
    vec![
        event.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        event.event_type.to_string(),
        event.actor.clone(),
    ]
}
