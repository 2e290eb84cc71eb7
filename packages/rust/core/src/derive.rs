//! Derived physical quantities computed from extracted parameters.
//!
//! Inputs are coerced to floats. Under [`MissingInputPolicy::Zero`] a missing
//! or non-numeric input counts as 0.0, so derivation always yields a value;
//! under [`MissingInputPolicy::NotAvailable`] the affected outputs are null.

use std::sync::LazyLock;

use regex::Regex;

use simreport_shared::schema::{
    APPLIED_FORCE, DEFORMATION_RANGE, ENERGY_RESIDUAL, MAX_EQUIVALENT_STRESS, MAX_FAILURE_LOAD,
    STRAIN_ENERGY, TENSILE_YIELD_STRENGTH, WORK_DONE, YIELD_CONSTRAINT_RESIDUAL,
};
use simreport_shared::{FieldValue, MissingInputPolicy, ParameterSet};

/// Standard gravity used to express a force as an equivalent mass (m/s²).
const STANDARD_GRAVITY: f64 = 9.8;

/// Derived values are rounded to this many decimal places.
const DECIMALS: usize = 5;

/// Return `params` plus Work Done, Energy Residual, Yield Constraint
/// Residual and Max Failure Load.
///
/// - Work Done = ½·|F|·d
/// - Energy Residual = |U − Work Done| (using the rounded Work Done)
/// - Yield Constraint Residual = max(0, σ_eq − σ_y)
/// - Max Failure Load = |F| / 9.8
///
/// All four are rounded to 5 decimal places.
pub fn derive_parameters(params: &ParameterSet, policy: MissingInputPolicy) -> ParameterSet {
    let input = |value: Option<f64>| match policy {
        MissingInputPolicy::Zero => Some(value.unwrap_or(0.0)),
        MissingInputPolicy::NotAvailable => value,
    };

    let force = input(params.number(APPLIED_FORCE).map(f64::abs));
    let deformation = input(deformation_magnitude(params.get(DEFORMATION_RANGE)));
    let stress = input(params.number(MAX_EQUIVALENT_STRESS));
    let yield_strength = input(params.number(TENSILE_YIELD_STRENGTH));
    let strain_energy = input(params.number(STRAIN_ENERGY));

    let work_done = force
        .zip(deformation)
        .map(|(f, d)| round_decimals(0.5 * f * d));
    let energy_residual = strain_energy
        .zip(work_done)
        .map(|(u, w)| round_decimals((u - w).abs()));
    let yield_residual = stress
        .zip(yield_strength)
        .map(|(s, y)| round_decimals((s - y).max(0.0)));
    let failure_load = force.map(|f| round_decimals(f / STANDARD_GRAVITY));

    let mut derived = params.clone();
    derived.insert(WORK_DONE, number_or_null(work_done));
    derived.insert(ENERGY_RESIDUAL, number_or_null(energy_residual));
    derived.insert(YIELD_CONSTRAINT_RESIDUAL, number_or_null(yield_residual));
    derived.insert(MAX_FAILURE_LOAD, number_or_null(failure_load));
    derived
}

/// Absolute maximum deformation: the second element of the min/max pair.
///
/// Accepts the pair as a list (`[0.0, 0.00637]`) or as text encoding one
/// (`"[0.0, 0.00637]"`). Anything else yields `None`.
pub fn deformation_magnitude(value: Option<&FieldValue>) -> Option<f64> {
    static PAIR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[(.*?),\s*(.*?)\]").expect("valid regex"));

    let max = match value? {
        FieldValue::List(items) => items.get(1).and_then(FieldValue::as_f64),
        FieldValue::Text(text) => PAIR_RE
            .captures(text)
            .and_then(|caps| caps.get(2))
            .and_then(|m| FieldValue::from(m.as_str()).as_f64()),
        FieldValue::Number(_) | FieldValue::Null => None,
    };

    max.map(f64::abs)
}

/// Round the exact binary value of `value` to [`DECIMALS`] places.
fn round_decimals(value: f64) -> f64 {
    format!("{value:.prec$}", prec = DECIMALS)
        .parse()
        .unwrap_or(value)
}

fn number_or_null(value: Option<f64>) -> FieldValue {
    value.map_or(FieldValue::Null, FieldValue::Number)
}
