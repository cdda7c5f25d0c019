use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::bom::BomLine;
use crate::domain::catalog::Part;

const MILLIMETRES_PER_METRE: i64 = 1000;

/// Weight of one line, or `None` when the part has no known unit weight.
/// Cut lines scale the unit weight by their length in metres.
pub fn line_weight(line: &BomLine, unit_weight_kg: Option<Decimal>) -> Option<Decimal> {
    let unit_weight = unit_weight_kg?;
    let length_factor = match line.cut_length_mm {
        Some(cut_length) => Decimal::from(cut_length) / Decimal::from(MILLIMETRES_PER_METRE),
        None => Decimal::ONE,
    };
    Some(unit_weight * line.quantity * length_factor)
}

/// Sum of all known line weights, rounded to two decimals with banker's
/// rounding.
pub fn total_weight(lines: &[BomLine], parts_by_sku: &HashMap<String, Part>) -> Decimal {
    lines
        .iter()
        .filter_map(|line| {
            line_weight(line, parts_by_sku.get(&line.part_sku).and_then(|part| part.weight_kg))
        })
        .sum::<Decimal>()
        .round_dp(2)
}
