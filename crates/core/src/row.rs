//! Untyped row model returned by the query-execution collaborator
//!
//! Executors produce `Row` values; typed mapping goes through serde so the
//! core stays free of any driver-specific result model.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A single result row: ordered column name/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// An empty row.
    pub fn new() -> Self {
        Row::default()
    }

    /// Append a column value.
    pub fn push(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    /// Look up a column by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate column name/value pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// The first column's value, if any. Used for scalar results.
    pub fn first_value(&self) -> Option<&Value> {
        self.columns.first().map(|(_, v)| v)
    }

    /// Deserialize the row into a typed value via serde.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let mut object = Map::with_capacity(self.columns.len());
        for (name, value) in self.columns {
            object.insert(name, value);
        }
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    #[test]
    fn test_get_by_name() {
        let row = Row::new().push("id", 7).push("name", "alice");
        assert_eq!(row.get("id"), Some(&json!(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_into_typed() {
        let row = Row::new().push("id", 7).push("name", "alice");
        let user: User = row.into_typed().unwrap();
        assert_eq!(
            user,
            User {
                id: 7,
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_into_typed_mismatch_fails() {
        let row = Row::new().push("id", "not-a-number");
        let result: Result<User> = row.into_typed();
        assert!(result.is_err());
    }

    #[test]
    fn test_first_value_for_scalars() {
        let row = Row::new().push("count", 11);
        assert_eq!(row.first_value(), Some(&json!(11)));
        assert_eq!(Row::new().first_value(), None);
    }
}
