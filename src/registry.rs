//! The standard field-definition registry used by the sale and key-init
//! handlers. Built once at process startup and shared read-only.

use crate::field::{FieldDefinition, FieldFormat};
use crate::message::FieldRegistry;

/// Field definitions for the subset of ISO 8583 fields this acquirer
/// simulator actually moves: PAN, processing code, amount, track 2,
/// response code, and the proprietary field 63 container, plus a handful
/// of neighboring fields terminals commonly populate.
pub fn standard_field_definitions() -> FieldRegistry {
    FieldRegistry::new([
        (2, FieldDefinition::variable(FieldFormat::N, 19)),
        (3, FieldDefinition::fixed(FieldFormat::N, 6)),
        (4, FieldDefinition::fixed(FieldFormat::N, 12)),
        (11, FieldDefinition::fixed(FieldFormat::N, 6)),
        (12, FieldDefinition::fixed(FieldFormat::N, 6)),
        (13, FieldDefinition::fixed(FieldFormat::N, 4)),
        (22, FieldDefinition::fixed(FieldFormat::N, 3)),
        (25, FieldDefinition::fixed(FieldFormat::N, 2)),
        (35, FieldDefinition::variable(FieldFormat::Z, 37)),
        (37, FieldDefinition::fixed(FieldFormat::An, 12)),
        (39, FieldDefinition::fixed(FieldFormat::An, 2)),
        (41, FieldDefinition::fixed(FieldFormat::Ans, 8)),
        (42, FieldDefinition::fixed(FieldFormat::Ans, 15)),
        (49, FieldDefinition::fixed(FieldFormat::N, 3)),
        (63, FieldDefinition::variable(FieldFormat::Ans, 999)),
    ])
    .expect("standard field registry definitions are all field >= 2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_error() {
        let _ = standard_field_definitions();
    }
}
