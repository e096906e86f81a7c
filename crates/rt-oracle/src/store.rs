//! Typed access to the actuation value held by the solver.
//!
//! The solver keeps the rotor rotation rate as the text definition of a field
//! function. The control loop works with `f64`; this adapter is the only
//! place where the value crosses into text.

use crate::error::{OracleError, OracleResult};
use crate::oracle::SolverOracle;
use rt_core::{ensure_finite, format_literal, parse_literal};

/// Reads and writes the actuation field of a solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationStore {
    field: String,
}

impl ActuationStore {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Read the current actuation value.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::StaleActuation`] if the field holds anything
    /// other than a single numeric literal (e.g. the symbolic expression it
    /// was initialised with).
    pub fn read<O: SolverOracle + ?Sized>(&self, oracle: &O) -> OracleResult<f64> {
        let definition = oracle.field_definition(&self.field)?;
        parse_literal(&definition).map_err(|_| OracleError::StaleActuation {
            field: self.field.clone(),
            definition,
        })
    }

    /// Write a new actuation value as a literal.
    pub fn write<O: SolverOracle + ?Sized>(&self, oracle: &mut O, value: f64) -> OracleResult<()> {
        let value = ensure_finite(value, "actuation")?;
        oracle.set_field_definition(&self.field, &format_literal(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surrogate::{AffinityPumpOracle, SurrogateConfig};
    use rt_core::names::ROTATION_FIELD;

    #[test]
    fn write_then_read_round_trips() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        let store = ActuationStore::new(ROTATION_FIELD);
        store.write(&mut oracle, 1999.989_610_3).unwrap();
        assert_eq!(store.read(&oracle).unwrap(), 1999.989_610_3);
        assert_eq!(
            oracle.field_definition(ROTATION_FIELD).unwrap(),
            "1999.9896103"
        );
    }

    #[test]
    fn symbolic_definition_is_stale() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        oracle
            .set_field_definition(ROTATION_FIELD, "$initialSpeed * 2")
            .unwrap();
        let store = ActuationStore::new(ROTATION_FIELD);
        match store.read(&oracle) {
            Err(OracleError::StaleActuation { field, definition }) => {
                assert_eq!(field, ROTATION_FIELD);
                assert_eq!(definition, "$initialSpeed * 2");
            }
            other => panic!("Expected StaleActuation, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_write_is_rejected() {
        let mut oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        let store = ActuationStore::new(ROTATION_FIELD);
        assert!(matches!(
            store.write(&mut oracle, f64::NAN),
            Err(OracleError::Numeric(_))
        ));
    }

    #[test]
    fn unknown_field_propagates() {
        let oracle = AffinityPumpOracle::new(SurrogateConfig::default());
        let store = ActuationStore::new("noSuchField");
        assert!(matches!(
            store.read(&oracle),
            Err(OracleError::UnknownField { .. })
        ));
    }
}
