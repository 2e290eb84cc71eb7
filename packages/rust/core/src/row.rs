//! Builds one output row from a derived parameter set.

use simreport_shared::schema::{
    self, BRIDGE_TYPE_COLUMN, ENTITY_ID_COLUMN, JOINT_DESIGN_COLUMN, LOAD_TYPE_COLUMN,
    NOT_AVAILABLE, SUPPORT_TYPE_COLUMN, SYMMETRY_COLUMN,
};
use simreport_shared::{FieldValue, ParameterSet, Row, RowDefaults};

/// Map `params` onto the fixed column layout.
///
/// Columns come out as: id, extracted parameters, derived parameters, then
/// the categorical defaults. A parameter that is absent or null becomes
/// `"N/A"`; anything else passes through unchanged, lists included. Keys
/// outside the vocabulary are ignored.
pub fn build_row(params: &ParameterSet, entity_id: u64, defaults: &RowDefaults) -> Row {
    let mut row = Row::new();
    row.push(ENTITY_ID_COLUMN, entity_id);

    for (parameter, column) in schema::parameter_columns() {
        let value = match params.get(parameter) {
            Some(value) if !value.is_null() => value.clone(),
            _ => FieldValue::from(NOT_AVAILABLE),
        };
        row.push(column, value);
    }

    row.push(BRIDGE_TYPE_COLUMN, defaults.bridge_type.as_str());
    row.push(SYMMETRY_COLUMN, defaults.symmetry as f64);
    row.push(JOINT_DESIGN_COLUMN, defaults.joint_design.as_str());
    row.push(LOAD_TYPE_COLUMN, defaults.load_type.as_str());
    row.push(SUPPORT_TYPE_COLUMN, defaults.support_type.as_str());
    row
}
