//! Append-only registry of configured systematic parameters.

use std::collections::HashMap;

use crate::types::{ParameterHeader, ParameterId};
use crate::{Error, Result};

/// Ordered collection of [`ParameterHeader`]s.
///
/// Built once at configuration time; immutable for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    headers: Vec<ParameterHeader>,
    index_by_id: HashMap<ParameterId, usize>,
    index_by_name: HashMap<String, usize>,
}

impl ParameterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id (one past the largest registered id).
    pub fn next_id(&self) -> ParameterId {
        ParameterId(self.headers.iter().map(|h| h.id.0 + 1).max().unwrap_or(0))
    }

    /// Validate, normalize and append a header. Returns its position.
    pub fn register(&mut self, mut header: ParameterHeader) -> Result<usize> {
        if self.index_by_name.contains_key(&header.name) {
            return Err(Error::DuplicateParameter(format!("name '{}'", header.name)));
        }
        if self.index_by_id.contains_key(&header.id) {
            return Err(Error::DuplicateParameter(format!("id {}", header.id)));
        }
        if header.name.is_empty() {
            return Err(Error::InvalidConfiguration("parameter name must be non-empty".into()));
        }
        if !header.central_value.is_finite() {
            return Err(Error::InvalidConfiguration(format!(
                "parameter '{}': central value must be finite, got {}",
                header.name, header.central_value
            )));
        }

        if header.is_correction {
            let ok = header.variations.is_empty()
                || (header.variations.len() == 1 && header.variations[0] == header.central_value);
            if !ok {
                return Err(Error::InvalidConfiguration(format!(
                    "correction '{}' must have exactly one variation equal to its central value {}, got {:?}",
                    header.name, header.central_value, header.variations
                )));
            }
            header.variations = vec![header.central_value];
        } else if header.variations.is_empty() && !header.is_responseless {
            return Err(Error::InvalidConfiguration(format!(
                "parameter '{}' has no variations",
                header.name
            )));
        }

        if let Some(v) = header.variations.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidConfiguration(format!(
                "parameter '{}': variations must be finite, got {v}",
                header.name
            )));
        }

        let idx = self.headers.len();
        self.index_by_id.insert(header.id, idx);
        self.index_by_name.insert(header.name.clone(), idx);
        log::debug!(
            "registered parameter '{}' (id {}, {} responses)",
            header.name,
            header.id,
            header.n_responses()
        );
        self.headers.push(header);
        Ok(idx)
    }

    /// Header for `id`.
    pub fn lookup(&self, id: ParameterId) -> Result<&ParameterHeader> {
        self.index_of_id(id)
            .map(|i| &self.headers[i])
            .ok_or_else(|| Error::UnknownParameter(format!("id {id}")))
    }

    /// Header for `name`.
    pub fn lookup_by_name(&self, name: &str) -> Result<&ParameterHeader> {
        self.index_of(name).map(|i| &self.headers[i])
    }

    /// Position of `name` in registration order.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.index_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownParameter(format!("name '{name}'")))
    }

    /// Position of `id` in registration order.
    pub fn index_of_id(&self, id: ParameterId) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    /// Declared response count for `id`.
    pub fn n_responses(&self, id: ParameterId) -> Result<usize> {
        self.lookup(id).map(ParameterHeader::n_responses)
    }

    /// Headers in registration order.
    pub fn headers(&self) -> &[ParameterHeader] {
        &self.headers
    }

    /// Headers that produce weight columns.
    pub fn responding(&self) -> impl Iterator<Item = &ParameterHeader> {
        self.headers.iter().filter(|h| !h.is_responseless)
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ParameterRegistry::new();
        let idx = reg
            .register(ParameterHeader::new(ParameterId(0), "rpa", 0.0, vec![-1.0, 0.0, 1.0]))
            .unwrap();
        assert_eq!(idx, 0);
        assert_eq!(reg.lookup(ParameterId(0)).unwrap().name, "rpa");
        assert_eq!(reg.lookup_by_name("rpa").unwrap().id, ParameterId(0));
        assert_eq!(reg.index_of("rpa").unwrap(), 0);
        assert_eq!(reg.next_id(), ParameterId(1));
    }

    #[test]
    fn test_duplicate_name_and_id_rejected() {
        let mut reg = ParameterRegistry::new();
        reg.register(ParameterHeader::new(ParameterId(0), "a", 0.0, vec![1.0])).unwrap();
        let dup_name = reg.register(ParameterHeader::new(ParameterId(1), "a", 0.0, vec![1.0]));
        assert!(matches!(dup_name, Err(Error::DuplicateParameter(_))));
        let dup_id = reg.register(ParameterHeader::new(ParameterId(0), "b", 0.0, vec![1.0]));
        assert!(matches!(dup_id, Err(Error::DuplicateParameter(_))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_unknown_parameter() {
        let reg = ParameterRegistry::new();
        assert!(matches!(reg.lookup(ParameterId(4)), Err(Error::UnknownParameter(_))));
        assert!(matches!(reg.lookup_by_name("x"), Err(Error::UnknownParameter(_))));
        assert!(matches!(reg.index_of("x"), Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn test_correction_is_normalized() {
        let mut reg = ParameterRegistry::new();
        let mut hdr = ParameterHeader::correction(ParameterId(0), "corr", 0.7);
        hdr.variations.clear();
        reg.register(hdr).unwrap();
        let stored = reg.lookup(ParameterId(0)).unwrap();
        assert_eq!(stored.variations, vec![0.7]);
        assert_eq!(stored.n_responses(), 1);
    }

    #[test]
    fn test_correction_with_foreign_variations_rejected() {
        let mut reg = ParameterRegistry::new();
        let mut hdr = ParameterHeader::correction(ParameterId(0), "corr", 0.7);
        hdr.variations = vec![0.0, 1.0];
        assert!(matches!(reg.register(hdr), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_sweep_without_variations_rejected() {
        let mut reg = ParameterRegistry::new();
        let hdr = ParameterHeader::new(ParameterId(0), "empty", 0.0, vec![]);
        assert!(matches!(reg.register(hdr), Err(Error::InvalidConfiguration(_))));

        let info = ParameterHeader::new(ParameterId(0), "info", 0.0, vec![]).responseless();
        reg.register(info).unwrap();
        assert_eq!(reg.responding().count(), 0);
    }

    proptest! {
        #[test]
        fn prop_correction_always_single_central(central in -10.0f64..10.0) {
            let mut reg = ParameterRegistry::new();
            reg.register(ParameterHeader::correction(ParameterId(0), "c", central)).unwrap();
            let hdr = reg.lookup(ParameterId(0)).unwrap();
            prop_assert_eq!(hdr.variations.len(), 1);
            prop_assert_eq!(hdr.variations[0], central);
        }

        #[test]
        fn prop_declared_count_matches_variations(
            vars in proptest::collection::vec(-5.0f64..5.0, 1..12),
        ) {
            let mut reg = ParameterRegistry::new();
            let n = vars.len();
            reg.register(ParameterHeader::new(ParameterId(2), "dial", 0.0, vars)).unwrap();
            prop_assert_eq!(reg.n_responses(ParameterId(2)).unwrap(), n);
        }
    }
}
