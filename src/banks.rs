// 🏦 Bank Catalog - CLABE bank codes
// Static code → institution-name table for the first 3 digits of a CLABE.
// Compiled into the binary and parsed once at first use; never mutated.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded catalog, one `code,name` row per institution.
static BANKS_CSV: &str = include_str!("banks.csv");

static CATALOG: OnceLock<HashMap<String, String>> = OnceLock::new();

fn catalog() -> &'static HashMap<String, String> {
    CATALOG.get_or_init(|| {
        let mut map = HashMap::new();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BANKS_CSV.as_bytes());

        for record in rdr.records().flatten() {
            if let (Some(code), Some(name)) = (record.get(0), record.get(1)) {
                map.insert(code.trim().to_string(), name.trim().to_string());
            }
        }

        map
    })
}

/// Institution name for a 3-digit CLABE bank code.
///
/// Unknown codes come back as the empty string; the owner can fill the
/// name in by hand in that case.
pub fn bank_name_for(code: &str) -> &'static str {
    catalog().get(code).map(String::as_str).unwrap_or("")
}

/// Number of institutions in the catalog.
pub fn catalog_size() -> usize {
    catalog().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(bank_name_for("002"), "Citibanamex");
        assert_eq!(bank_name_for("012"), "BBVA");
        assert_eq!(bank_name_for("014"), "Santander");
        assert_eq!(bank_name_for("021"), "HSBC");
        assert_eq!(bank_name_for("072"), "Banorte");
        assert_eq!(bank_name_for("638"), "Nu Bank");
        assert_eq!(bank_name_for("722"), "Mercado Pago");
    }

    #[test]
    fn test_unknown_code_maps_to_empty() {
        assert_eq!(bank_name_for("999"), "");
        assert_eq!(bank_name_for(""), "");
    }

    #[test]
    fn test_catalog_loads_every_row() {
        // Header excluded
        assert_eq!(catalog_size(), 23);
    }
}
