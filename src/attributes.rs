//! Attribute projection.

use crate::store::UserRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Columns never released as attributes.
pub const DENY_LIST: [&str; 4] = ["password", "remember_token", "login_attempts", "updated_at"];

/// Attribute name to distinct values, first-seen order.
#[derive(ToSchema, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, Vec<String>>);

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a set of rows. Rows sharing a column contribute distinct
    /// values to the same attribute.
    #[must_use]
    pub fn from_records(records: &[UserRecord]) -> Self {
        let mut attributes = Self::new();
        for record in records {
            attributes.extend_from_record(record);
        }
        attributes
    }

    pub fn extend_from_record(&mut self, record: &UserRecord) {
        for (name, value) in record.columns() {
            if let Some(value) = value {
                self.insert(name, value);
            }
        }
    }

    /// Add one value. Denied names and duplicate values are ignored.
    pub fn insert(&mut self, name: &str, value: &str) {
        if DENY_LIST.contains(&name) {
            return;
        }

        let values = self.0.entry(name.to_string()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
