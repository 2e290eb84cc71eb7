//! Parameter vocabulary and output row schema.
//!
//! Parameter names double as column names and carry their physical units.

// ---------------------------------------------------------------------------
// Extracted parameters
// ---------------------------------------------------------------------------

pub const BRIDGE_LENGTH: &str = "Bridge Length (m)";
pub const BRIDGE_WIDTH: &str = "Bridge Width (m)";
pub const BRIDGE_HEIGHT: &str = "Bridge Height (m)";
pub const CROSS_SECTION_DIAMETER: &str = "Cross-Sectional Diameter (m)";
pub const CROSS_SECTION_AREA: &str = "Cross-Sectional Area (m²)";
pub const CROSS_SECTION_INERTIA: &str = "Cross-Sectional Moment of Inertia (m⁴)";
pub const STRAND_COUNT: &str = "Number of Strands";
pub const BEAM_COUNT: &str = "Number of Beams";
pub const INCLINATION_ANGLE: &str = "Angle of Inclination (°)";
pub const DECLINATION_ANGLE: &str = "Angle of Declination (°)";
pub const YOUNGS_MODULUS: &str = "Young's Modulus (Pa)";
pub const POISSONS_RATIO: &str = "Poisson's Ratio";
pub const DENSITY: &str = "Density (kg/m³)";
pub const TENSILE_YIELD_STRENGTH: &str = "Tensile Yield Strength (Pa)";
pub const SHEAR_MODULUS: &str = "Shear Modulus (Pa)";
pub const APPLIED_FORCE: &str = "Applied Force (N)";
pub const MESH_ELEMENTS: &str = "Mesh Elements";
pub const MESH_DENSITY: &str = "Mesh Density (elements/m³)";
pub const MAX_EQUIVALENT_STRESS: &str = "Max Equivalent Stress (Pa)";
pub const MAX_PRINCIPAL_STRESS: &str = "Max Principal Stress (Pa)";
pub const DEFORMATION_RANGE: &str = "Min/Max Deformation (m)";
pub const SAFETY_FACTOR: &str = "Safety Factor";
pub const REACTION_FORCES: &str = "Reaction Forces (N)";
pub const STRAIN_ENERGY: &str = "Strain Energy (J)";

/// The fixed vocabulary the extraction step is asked to fill.
pub const EXTRACTED_PARAMETERS: [&str; 24] = [
    BRIDGE_LENGTH,
    BRIDGE_WIDTH,
    BRIDGE_HEIGHT,
    CROSS_SECTION_DIAMETER,
    CROSS_SECTION_AREA,
    CROSS_SECTION_INERTIA,
    STRAND_COUNT,
    BEAM_COUNT,
    INCLINATION_ANGLE,
    DECLINATION_ANGLE,
    YOUNGS_MODULUS,
    POISSONS_RATIO,
    DENSITY,
    TENSILE_YIELD_STRENGTH,
    SHEAR_MODULUS,
    APPLIED_FORCE,
    MESH_ELEMENTS,
    MESH_DENSITY,
    MAX_EQUIVALENT_STRESS,
    MAX_PRINCIPAL_STRESS,
    DEFORMATION_RANGE,
    SAFETY_FACTOR,
    REACTION_FORCES,
    STRAIN_ENERGY,
];

// ---------------------------------------------------------------------------
// Derived parameters
// ---------------------------------------------------------------------------

pub const WORK_DONE: &str = "Work Done (J)";
pub const ENERGY_RESIDUAL: &str = "Energy Residual (J)";
pub const YIELD_CONSTRAINT_RESIDUAL: &str = "Yield Constraint Residual";
pub const MAX_FAILURE_LOAD: &str = "Max Failure Load (kg)";

pub const DERIVED_PARAMETERS: [&str; 4] = [
    WORK_DONE,
    ENERGY_RESIDUAL,
    YIELD_CONSTRAINT_RESIDUAL,
    MAX_FAILURE_LOAD,
];

// ---------------------------------------------------------------------------
// Output columns
// ---------------------------------------------------------------------------

/// Identifier column holding the sequential entity id.
pub const ENTITY_ID_COLUMN: &str = "Bridge ID";

/// Written wherever a mapped column has no value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Destination column for [`MAX_FAILURE_LOAD`].
///
/// Labelled in newtons but holds kilograms. Existing templates and their
/// consumers use this label, so it is kept as-is.
pub const MAX_FAILURE_LOAD_COLUMN: &str = "Max Failure Load (N)";

pub const BRIDGE_TYPE_COLUMN: &str = "Bridge Type";
pub const SYMMETRY_COLUMN: &str = "Symmetry";
pub const JOINT_DESIGN_COLUMN: &str = "Joint Design";
pub const LOAD_TYPE_COLUMN: &str = "Load Type";
pub const SUPPORT_TYPE_COLUMN: &str = "Support Type";

/// Categorical columns filled from defaults rather than extraction.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    BRIDGE_TYPE_COLUMN,
    SYMMETRY_COLUMN,
    JOINT_DESIGN_COLUMN,
    LOAD_TYPE_COLUMN,
    SUPPORT_TYPE_COLUMN,
];

/// Destination column for a parameter key.
pub fn column_for(parameter: &str) -> &str {
    if parameter == MAX_FAILURE_LOAD {
        MAX_FAILURE_LOAD_COLUMN
    } else {
        parameter
    }
}

/// `(parameter, column)` pairs in output order: extracted then derived.
pub fn parameter_columns() -> impl Iterator<Item = (&'static str, &'static str)> {
    EXTRACTED_PARAMETERS
        .into_iter()
        .chain(DERIVED_PARAMETERS)
        .map(|p| (p, column_for(p)))
}

/// Every column of a built row, in order.
pub fn row_columns() -> Vec<&'static str> {
    std::iter::once(ENTITY_ID_COLUMN)
        .chain(parameter_columns().map(|(_, c)| c))
        .chain(CATEGORICAL_COLUMNS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_load_keeps_legacy_column_label() {
        assert_eq!(column_for(MAX_FAILURE_LOAD), "Max Failure Load (N)");
        assert_eq!(column_for(APPLIED_FORCE), APPLIED_FORCE);
    }

    #[test]
    fn row_columns_are_unique_and_complete() {
        let cols = row_columns();
        assert_eq!(cols.len(), 1 + 24 + 4 + 5);
        assert_eq!(cols[0], ENTITY_ID_COLUMN);

        let mut sorted = cols.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), cols.len());
    }
}
