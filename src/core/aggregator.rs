use crate::domain::models::{MergedOutput, SourceUnit};
use log::{debug, info};
use std::collections::BTreeSet;

pub fn header_line(generated_at: &str) -> String {
    format!("// File generated by source-combine at {}", generated_at)
}

/// Units without a scope first, then by scope name length. Ties keep discovery order.
pub fn order_units(mut units: Vec<SourceUnit>) -> Vec<SourceUnit> {
    units.sort_by_key(SourceUnit::scope_len);
    units
}

/// Every distinct import across `units`, sorted by codepoint.
pub fn merge_imports(units: &[SourceUnit]) -> Vec<String> {
    units
        .iter()
        .flat_map(|unit| unit.imports.iter().cloned())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

pub fn aggregate(units: Vec<SourceUnit>, generated_at: &str) -> MergedOutput {
    debug!("Aggregating {} units", units.len());
    let imports = merge_imports(&units);
    let ordered = order_units(units);

    let total = ordered.len();
    let sections = ordered
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            info!(
                "[{}/{}] Aggregating {}",
                i + 1,
                total,
                unit.origin_path.display()
            );
            unit.body_text()
        })
        .collect();

    MergedOutput {
        header: header_line(generated_at),
        imports,
        sections,
    }
}
