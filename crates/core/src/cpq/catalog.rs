use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::cpq::weight;
use crate::domain::bom::BomLine;
use crate::domain::catalog::Part;
use crate::rules::BomSkeletonLine;

/// Parts keyed by SKU, loaded for one BOM generation.
#[derive(Clone, Debug, Default)]
pub struct PartCatalog {
    parts: HashMap<String, Part>,
}

impl PartCatalog {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts: parts.into_iter().map(|part| (part.sku.clone(), part)).collect() }
    }

    pub fn find(&self, sku: &str) -> Option<&Part> {
        self.parts.get(sku)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Catalog name, category and unit take precedence over the text the
    /// decision engine supplied.
    pub fn enrich(&self, line: &BomSkeletonLine, sku: &str) -> BomLine {
        let part = self.find(sku);
        BomLine {
            part_sku: sku.to_owned(),
            part_name: part.map(|part| part.name.clone()).or_else(|| line.name.clone()),
            category: part.map(|part| part.category.clone()).or_else(|| line.category.clone()),
            quantity: line.quantity,
            unit: part.map(|part| part.unit.clone()).unwrap_or_else(|| line.unit.clone()),
            cut_length_mm: line.cut_length_mm,
            sort_order: line.sort_order,
            notes: line.notes.clone(),
        }
    }

    pub fn total_weight(&self, lines: &[BomLine]) -> Decimal {
        weight::total_weight(lines, &self.parts)
    }
}

/// Stable ordering by `sort_order`.
pub fn sort_lines(lines: &mut [BomLine]) {
    lines.sort_by_key(|line| line.sort_order);
}
