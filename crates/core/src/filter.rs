//! Dimension filters and their canonical (sorted) form.
//!
//! Canonical ordering is what makes two structurally equal requests produce
//! the same fingerprint regardless of the order the client listed them in.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A requested dimension and the values to keep for it.
///
/// ```json
/// { "id": "dimension id", "options": ["dimension", "values"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub id: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl DimensionFilter {
    pub fn new<I, S>(id: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Dimension name → sorted set of values, sorted by dimension name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalFilters(BTreeMap<String, BTreeSet<String>>);

impl CanonicalFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize a list of requested filters.
    ///
    /// A dimension listed twice keeps the options of its last occurrence.
    pub fn from_filters(filters: &[DimensionFilter]) -> Self {
        let mut map = BTreeMap::new();
        for filter in filters {
            map.insert(
                filter.id.clone(),
                filter.options.iter().cloned().collect::<BTreeSet<_>>(),
            );
        }
        Self(map)
    }

    /// Same filters without the dimensions that request no values.
    pub fn without_empty(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn insert<I, S>(&mut self, dimension: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(dimension.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    pub fn get(&self, dimension: &str) -> Option<&BTreeSet<String>> {
        self.0.get(dimension)
    }

    pub fn contains_dimension(&self, dimension: &str) -> bool {
        self.0.contains_key(dimension)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    /// Every (dimension, value) pair, in canonical order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(dim, values)| values.iter().map(move |v| (dim.as_str(), v.as_str())))
    }
}

impl From<BTreeMap<String, BTreeSet<String>>> for CanonicalFilters {
    fn from(value: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self(value)
    }
}

/// Renders as `{colour=[blue, red], size=[L]}`. Fingerprints are computed over
/// this rendering, so it must not change.
impl core::fmt::Display for CanonicalFilters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (i, (dimension, values)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dimension}=[")?;
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(value)?;
            }
            f.write_str("]")?;
        }
        f.write_str("}")
    }
}
