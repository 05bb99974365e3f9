//! Field splitting for the publisher's quoting convention.
//!
//! Rows look like `"a";"b";"c"`. Quotes never nest and are never escaped, so
//! the quoted separator `";"` is the reliable field boundary. Rows without
//! quotes fall back to a plain `;` split.

/// Marker that cannot appear in decoded single-byte text.
const FIELD_MARKER: &str = "\u{1f}";

/// Split one decoded line into its fields.
///
/// # Examples
/// ```
/// # use cnpj_data::archive::tokenize;
/// assert_eq!(tokenize(r#""1";"x;y";"3""#), vec!["1", "x;y", "3"]);
/// assert_eq!(tokenize("1;2;3"), vec!["1", "2", "3"]);
/// ```
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let marked = line.replace("\";\"", FIELD_MARKER);
    let unquoted = marked.replace('"', "");
    let fields: Vec<String> = unquoted.split(FIELD_MARKER).map(str::to_owned).collect();
    if fields.len() > 1 {
        return fields;
    }
    line.replace('"', "").split(';').map(str::to_owned).collect()
}
