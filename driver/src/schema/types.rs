/// Canonical integer type name.
const INT64: &str = "INT64";

/// Returns the canonical name of a warehouse type.
///
/// BigQuery accepts several aliases for the same physical type. Two columns whose types normalize
/// to the same name store identical values.
pub fn normalize_type(typ: &str) -> String {
    let typ = typ.trim().to_uppercase();

    match typ.as_str() {
        "INT" | "SMALLINT" | "INTEGER" | "BIGINT" | "TINYINT" | "BYTEINT" | INT64 => {
            INT64.to_string()
        }
        "DECIMAL" => "NUMERIC".to_string(),
        "BIGDECIMAL" => "BIGNUMERIC".to_string(),
        "FLOAT" => "FLOAT64".to_string(),
        "BOOLEAN" => "BOOL".to_string(),
        _ => typ,
    }
}
