use crate::register::canonical::CanonicalTable;
use crate::register::convert::Value;
use crate::register::schema::RegisterSchema;

const SCHEMA_RULE: &str =
    "---+--------------------------+-------+----------+---------+---------+--------------------+------+-----------";
const CANONICAL_RULE: &str = "---+--------------------------+----------------------+------+------------------";

// Display picks the rendering from the value tag; this only aligns it.
fn cell(value: &Value, width: usize) -> String {
    format!("{:>width$}", value.to_string(), width = width)
}

/// Renders the device register table, one line per row.
pub fn schema_table(schema: &RegisterSchema) -> Vec<String> {
    let mut lines = Vec::with_capacity(schema.len() + 3);
    lines.push(
        "GR | NAME                     |  REG  | ADDR HEX | VAL HEX | VAL DEC |           VAL CONV | UNIT | DESC"
            .to_string(),
    );
    lines.push(SCHEMA_RULE.to_string());

    for row in schema.rows() {
        lines.push(format!(
            "{} | {:<24} | {:>5} |  0x{:04X}  |  0x{:04X} | {:>6}  | {} | {:<4} | {}",
            row.group,
            format!("{:?}", row.name),
            row.address,
            row.address,
            row.raw,
            row.raw,
            cell(&row.converted, 18),
            row.unit,
            row.description
        ));
    }

    lines.push(SCHEMA_RULE.to_string());
    lines
}

/// Renders the canonical table, one line per row.
pub fn canonical_table(table: &CanonicalTable) -> Vec<String> {
    let mut lines = Vec::with_capacity(table.len() + 3);
    lines.push("GR | NAME                     |                VALUE | UNIT | DESC".to_string());
    lines.push(CANONICAL_RULE.to_string());

    for row in table.rows() {
        lines.push(format!(
            "{} | {:<24} | {} | {:<4} | {}",
            row.group,
            row.name.key(),
            cell(&row.converted, 20),
            row.unit,
            row.description
        ));
    }

    lines.push(CANONICAL_RULE.to_string());
    lines
}
