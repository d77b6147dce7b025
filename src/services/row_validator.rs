//! Pure per-row validation. No I/O; duplicate checks live elsewhere.

use chrono::NaiveDate;

use crate::services::row_parser::RawRow;
use crate::types::{EmployeeRow, SkipReason};

/// Validates one raw row into an [`EmployeeRow`]. All five required fields
/// must be present and non-blank. The cpf is reduced to its digits so
/// "123.456.789-09" and "12345678909" compare equal downstream.
pub fn validate_row(raw: &RawRow) -> Result<EmployeeRow, SkipReason> {
    let name = required(raw, "name")?;
    let cpf_raw = required(raw, "cpf")?;
    let email = required(raw, "email")?;
    let position = required(raw, "position")?;
    let hired_at_raw = required(raw, "hired_at")?;

    let cpf: String = cpf_raw.chars().filter(char::is_ascii_digit).collect();
    if cpf.is_empty() {
        return Err(SkipReason::InvalidField {
            field: "cpf".to_string(),
            value: cpf_raw,
        });
    }

    let hired_at = parse_hired_at(&hired_at_raw).ok_or_else(|| SkipReason::InvalidField {
        field: "hired_at".to_string(),
        value: hired_at_raw.clone(),
    })?;

    Ok(EmployeeRow {
        name,
        cpf,
        email,
        position,
        hired_at,
    })
}

fn required(raw: &RawRow, field: &str) -> Result<String, SkipReason> {
    match raw.get(field).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(SkipReason::MissingField(field.to_string())),
    }
}

fn parse_hired_at(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

// =============================================================================
// Tests
// =============================================================================
