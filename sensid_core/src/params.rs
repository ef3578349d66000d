// sensid_core/src/params.rs

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{IdentificationError, IdentificationResult};

/// A named set of physical parameters (e.g. `c1`, `m2`).
///
/// Keys are unique and lookups do not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Like `get`, but a missing name is an error.
    pub fn require(&self, name: &str) -> IdentificationResult<f64> {
        self.get(name)
            .ok_or_else(|| IdentificationError::MissingParameter(name.to_string()))
    }

    /// Inserts or overwrites a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    /// Overwrites an existing entry. Unknown names are an error, so a typo
    /// can never silently add a new parameter.
    pub fn set(&mut self, name: &str, value: f64) -> IdentificationResult<()> {
        match self.0.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(IdentificationError::MissingParameter(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Disjoint union of two sets. A shared name is an error.
    pub fn merged(&self, other: &ParameterSet) -> IdentificationResult<ParameterSet> {
        let mut out = self.clone();
        for (name, value) in other.iter() {
            if out.insert(name, value).is_some() {
                return Err(IdentificationError::DuplicateParameter(name.to_string()));
            }
        }
        Ok(out)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The free parameters `β`, in a fixed order.
///
/// The order defines the columns of the sensitivity matrix and the
/// components of every parameter increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeParameters {
    entries: Vec<(String, f64)>,
}

impl FreeParameters {
    /// Builds the ordered set, rejecting repeated names.
    pub fn new<S, I>(entries: I) -> IdentificationResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut out: Vec<(String, f64)> = Vec::new();
        for (name, value) in entries {
            let name = name.into();
            if out.iter().any(|(n, _)| *n == name) {
                return Err(IdentificationError::DuplicateParameter(name));
            }
            out.push((name, value));
        }
        Ok(Self { entries: out })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// The current values as a column vector, in declaration order.
    pub fn values(&self) -> DVector<f64> {
        DVector::from_iterator(self.len(), self.entries.iter().map(|(_, v)| *v))
    }

    /// `β += Δβ`, component-wise in declaration order.
    pub fn apply_increment(&mut self, delta: &DVector<f64>) -> IdentificationResult<()> {
        self.check_len(delta, "FreeParameters::apply_increment")?;
        for ((_, value), d) in self.entries.iter_mut().zip(delta.iter()) {
            *value += d;
        }
        Ok(())
    }

    pub fn to_parameter_set(&self) -> ParameterSet {
        self.iter().collect()
    }

    fn check_len(&self, v: &DVector<f64>, context: &'static str) -> IdentificationResult<()> {
        if v.len() != self.len() {
            return Err(IdentificationError::dimension(
                context,
                (self.len(), 1),
                (v.len(), 1),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_rejects_overlap() {
        let fixed: ParameterSet = [("c2", 0.3), ("m1", 12.0)].into_iter().collect();
        let free: ParameterSet = [("c1", 0.1), ("m1", 11.0)].into_iter().collect();
        assert_eq!(
            fixed.merged(&free),
            Err(IdentificationError::DuplicateParameter("m1".into()))
        );
    }

    #[test]
    fn merged_is_order_independent() {
        let a: ParameterSet = [("c2", 0.3)].into_iter().collect();
        let b: ParameterSet = [("c1", 0.1)].into_iter().collect();
        assert_eq!(a.merged(&b).unwrap(), b.merged(&a).unwrap());
    }

    #[test]
    fn set_does_not_create_new_names() {
        let mut p: ParameterSet = [("c1", 0.1)].into_iter().collect();
        assert!(p.set("c9", 1.0).is_err());
        p.set("c1", 0.2).unwrap();
        assert_eq!(p.get("c1"), Some(0.2));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn free_parameters_keep_declaration_order() {
        let mut beta = FreeParameters::new([("m2", 21.0), ("c1", 0.1), ("c4", 0.08)]).unwrap();
        assert_eq!(beta.names(), vec!["m2", "c1", "c4"]);

        beta.apply_increment(&DVector::from_vec(vec![-1.0, 0.02, 0.01]))
            .unwrap();
        assert_eq!(beta.get("m2"), Some(20.0));
        assert!((beta.get("c1").unwrap() - 0.12).abs() < 1e-15);
    }

    #[test]
    fn free_parameters_reject_repeats_and_bad_increments() {
        assert!(FreeParameters::new([("c1", 0.1), ("c1", 0.2)]).is_err());

        let mut beta = FreeParameters::new([("c1", 0.1)]).unwrap();
        let err = beta.apply_increment(&DVector::zeros(2)).unwrap_err();
        assert!(matches!(err, IdentificationError::Dimension { .. }));
    }
}
