//! VAR keyed value files.
//!
//! A small XML document with one `<section name="...">` per identifier. The
//! section body is plain text: a `Values=N` line followed by N rows of an
//! index column (width 3) and a value column (width 20, right aligned).

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use rb_core::ENGINE_MISSING_VALUE;

use crate::format::plain_number;
use crate::{DatasetResult, io_error};

/// Content of one VAR section.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    /// A sequence of values. Non-finite values are written as missing.
    Series(Vec<f64>),
    /// A boolean switch, written as `1` / `0`.
    Flag(bool),
}

fn missing() -> String {
    format!("{ENGINE_MISSING_VALUE}")
}

fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn section_body(value: &VarValue) -> String {
    let mut body = String::from("\n");
    match value {
        VarValue::Series(values) if values.is_empty() => {
            body.push_str("Values=1\n");
            body.push_str(&format!("{:>3}\t{:>20}\n", -1, missing()));
        }
        VarValue::Series(values) => {
            body.push_str(&format!("Values={}\n", values.len()));
            for v in values {
                let text = if v.is_finite() { plain_number(*v) } else { missing() };
                body.push_str(&format!("{:>3}\t{:>20}\n", 1, text));
            }
        }
        VarValue::Flag(flag) => {
            body.push_str("Values=1\n");
            body.push_str(&format!("{:>3}\t{:>20}\n", 1, u8::from(*flag)));
        }
    }
    body
}

/// Render a VAR document for `entries`, in the given order.
pub fn render_var(entries: &[(String, VarValue)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" ?>\n<variation_para>\n");
    for (identifier, value) in entries {
        xml.push_str(&format!(
            "\t<section name=\"{}\">{}</section>\n",
            escape_attribute(identifier),
            section_body(value)
        ));
    }
    xml.push_str("</variation_para>\n");
    xml
}

/// Write a VAR file and flush it to disk.
pub fn write_var_file(path: &Path, entries: &[(String, VarValue)]) -> DatasetResult<()> {
    tracing::info!(file = %path.display(), sections = entries.len(), "writing VAR file");
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let content = render_var(entries);
    let file = File::create(path).map_err(io_error(path))?;
    let mut out = BufWriter::new(file);
    out.write_all(content.as_bytes())
        .and_then(|_| out.flush())
        .and_then(|_| out.get_ref().sync_all())
        .map_err(io_error(path))
}
