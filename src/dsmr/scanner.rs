use crate::dsmr::obis::{ObisField, ObisTable, ValueKind};
use crate::error::DecodeError;

/// Value slice of one field, as byte positions into the telegram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slice {
    open: usize,
    close: usize,
}

fn malformed(field: &ObisField, reason: impl Into<String>) -> DecodeError {
    DecodeError::TelegramMalformed {
        field: format!("{:?}", field.id),
        code: field.code.to_string(),
        reason: reason.into(),
    }
}

// A code only counts when it is not the tail of a longer code, so "1.7.0"
// never matches inside "21.7.0".
fn find_code(telegram: &str, code: &str, from: usize) -> Option<usize> {
    let bytes = telegram.as_bytes();
    let mut start = from;
    while let Some(found) = telegram.get(start..)?.find(code) {
        let at = start + found;
        match at.checked_sub(1).map(|i| bytes[i]) {
            Some(b) if b.is_ascii_digit() || b == b'.' => start = at + 1,
            _ => return Some(at),
        }
    }
    None
}

fn brackets(telegram: &str, from: usize, field: &ObisField) -> Result<Slice, DecodeError> {
    let rest = telegram.get(from..).ok_or_else(|| malformed(field, "cursor past end"))?;
    let open = rest
        .find('(')
        .map(|i| from + i + 1)
        .ok_or_else(|| malformed(field, "no opening bracket"))?;
    let close = telegram[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| malformed(field, "no closing bracket"))?;

    Ok(Slice { open, close })
}

fn digits_value(field: &ObisField, raw: &str) -> Result<f64, DecodeError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(malformed(field, format!("no digits in {:?}", raw)));
    }
    let number: u64 = digits
        .parse()
        .map_err(|_| malformed(field, format!("{} does not fit in 64 bits", digits)))?;

    Ok(number as f64 / field.divisor.max(1) as f64)
}

fn parse(field: &ObisField, raw: &str) -> Result<(String, Option<f64>), DecodeError> {
    let value = match field.kind {
        ValueKind::Numeric => Some(digits_value(field, raw)?),
        ValueKind::Text | ValueKind::Timestamp => None,
    };

    Ok((raw.to_string(), value))
}

/// Reads every field of `fields` from `telegram` without touching the table.
///
/// Fields are searched in table order, each starting at the closing bracket
/// of the one before. The last field shares its code with the field before it
/// and is taken from the next bracket pair, dropping the unit character fused
/// against the closing bracket.
pub fn scan_fields(telegram: &str, fields: &[ObisField]) -> Result<Vec<(String, Option<f64>)>, DecodeError> {
    let Some((last, leading)) = fields.split_last() else {
        return Ok(Vec::new());
    };

    let mut staged = Vec::with_capacity(fields.len());
    let mut cursor = 0;

    for field in leading {
        let at = find_code(telegram, field.code, cursor).ok_or_else(|| malformed(field, "code not found"))?;
        let slice = brackets(telegram, at + field.code.len(), field)?;
        staged.push(parse(field, &telegram[slice.open..slice.close])?);
        cursor = slice.close;
    }

    let slice = brackets(telegram, cursor, last)?;
    if slice.close <= slice.open {
        return Err(malformed(last, "empty value"));
    }
    let raw = telegram
        .get(slice.open..slice.close - 1)
        .ok_or_else(|| malformed(last, "unit suffix is not a single byte"))?;
    staged.push(parse(last, raw)?);

    Ok(staged)
}

/// Scans a telegram into `table`. On error the table keeps its prior values.
pub fn scan(telegram: &str, table: &mut ObisTable) -> Result<(), DecodeError> {
    let staged = scan_fields(telegram, table.fields())?;

    for (field, (raw, value)) in table.fields_mut().iter_mut().zip(staged) {
        field.raw = raw;
        field.value = value;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_codes_are_skipped() {
        let telegram = "1-0:21.7.0(00.100*kW)\r\n1-0:1.7.0(00.200*kW)";
        assert_eq!(find_code(telegram, "1.7.0", 0), Some(27));
        assert_eq!(find_code(telegram, "21.7.0", 0), Some(4));
        assert_eq!(find_code(telegram, "2.7.0", 0), None);
    }

    #[test]
    fn brackets_follow_the_cursor() {
        let telegram = "a(1)b(2)";
        let table = ObisTable::new();
        let field = &table.fields()[0];
        assert_eq!(brackets(telegram, 0, field), Ok(Slice { open: 2, close: 3 }));
        assert_eq!(brackets(telegram, 3, field), Ok(Slice { open: 6, close: 7 }));
        assert!(brackets(telegram, 7, field).is_err());
    }

    #[test]
    fn digits_drop_points_and_units() {
        let table = ObisTable::new();
        let field = &table.fields()[3];
        assert_eq!(digits_value(field, "000123.456*kWh"), Ok(123.456));
        assert!(digits_value(field, "*kWh").is_err());
        assert!(digits_value(field, "123456789012345678901234").is_err());
    }
}
