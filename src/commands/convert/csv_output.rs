use super::*;

/// Writes the assembled rows as CSV, header first, `\n` line terminator.
pub fn write_csv(path: &Path, rows: &RowSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut output = String::new();
    output.push_str(&encode_line(&rows.header));
    for row in &rows.rows {
        let fields = row
            .iter()
            .map(CellValue::to_field)
            .collect::<Vec<String>>();
        output.push_str(&encode_line(&fields));
    }

    fs::write(path, output).with_context(|| format!("failed to write csv: {}", path.display()))
}

pub fn encode_line(fields: &[String]) -> String {
    let mut line = fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<String>>()
        .join(",");
    line.push('\n');
    line
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
