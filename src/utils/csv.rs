use chrono::NaiveDate;

/// A built export: text blob plus the download filename.
///
/// Writing the blob anywhere is the embedder's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// Quote one field, doubling embedded quotes (`"` becomes `""`).
pub fn escape_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Join headers and rows into a delimited blob. Every field is quoted.
pub fn build_blob(headers: &[&str], rows: &[Vec<String>], delimiter: char) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string()),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|f| escape_field(f))
                .collect::<Vec<_>>()
                .join(&delimiter.to_string()),
        );
    }
    lines.join("\n")
}

/// Filename for the operator day export: `registros_DD-MM-YYYY.csv`.
pub fn day_export_filename(day: NaiveDate) -> String {
    format!("registros_{}.csv", day.format("%d-%m-%Y"))
}

/// Filename for the reports export: `relatorio_roletas_YYYY-MM-DD.csv`.
pub fn report_export_filename(today: NaiveDate) -> String {
    format!("relatorio_roletas_{}.csv", today.format("%Y-%m-%d"))
}
