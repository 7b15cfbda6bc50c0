// Masked display of stored identifiers
// Any surface that shows a detail (dashboard, public profile, audit events)
// goes through here; raw digits never render.

use crate::validation::DetailKind;

const MASK_CHAR: char = '*';

/// Obfuscate a stored value for display.
///
/// - Card: 12 mask characters + last 4 digits
/// - CLABE: first 3 digits + 12 mask characters + last 3 digits
/// - Account: everything but the last 4 digits masked
///
/// Empty input masks to the empty string.
pub fn mask(kind: DetailKind, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    match kind {
        DetailKind::Card => {
            let tail = tail_chars(value, 4);
            format!("{}{}", mask_run(12), tail)
        }
        DetailKind::Clabe => {
            let head: String = value.chars().take(3).collect();
            let tail = tail_chars(value, 3);
            format!("{}{}{}", head, mask_run(12), tail)
        }
        DetailKind::Account => {
            let hidden = value.chars().count().saturating_sub(4);
            let tail = tail_chars(value, 4);
            format!("{}{}", mask_run(hidden), tail)
        }
    }
}

fn mask_run(n: usize) -> String {
    std::iter::repeat(MASK_CHAR).take(n).collect()
}

fn tail_chars(value: &str, n: usize) -> String {
    let skip = value.chars().count().saturating_sub(n);
    value.chars().skip(skip).collect()
}
