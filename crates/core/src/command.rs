//! Structured command model passed to the query-execution collaborator
//!
//! The core never parses SQL or binds parameters itself; `SqlCommand` is an
//! opaque envelope the executor interprets. Timeout and command kind travel
//! as pass-through fields.

use serde_json::Value;
use std::time::Duration;

/// How the command text should be interpreted by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Plain SQL text
    #[default]
    Text,
    /// Name of a stored procedure
    StoredProcedure,
}

/// A single named command parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    /// Parameter name without any driver-specific prefix
    pub name: String,
    /// Parameter value in the executor's value model
    pub value: Value,
}

/// A command to run against the active connection/transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    /// SQL text or stored procedure name
    pub text: String,
    /// Named parameters, in bind order
    pub params: Vec<SqlParam>,
    /// Optional per-command timeout, forwarded to the executor
    pub timeout: Option<Duration>,
    /// Interpretation of `text`
    pub kind: CommandKind,
}

impl SqlCommand {
    /// Create a plain-text command without parameters.
    pub fn text(text: impl Into<String>) -> Self {
        SqlCommand {
            text: text.into(),
            params: Vec::new(),
            timeout: None,
            kind: CommandKind::Text,
        }
    }

    /// Create a stored-procedure command.
    pub fn stored_procedure(name: impl Into<String>) -> Self {
        SqlCommand {
            kind: CommandKind::StoredProcedure,
            ..SqlCommand::text(name)
        }
    }

    /// Append a named parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push(SqlParam {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Set a per-command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&str> for SqlCommand {
    fn from(text: &str) -> Self {
        SqlCommand::text(text)
    }
}

impl From<String> for SqlCommand {
    fn from(text: String) -> Self {
        SqlCommand::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_command_defaults() {
        let cmd = SqlCommand::text("SELECT 1");
        assert_eq!(cmd.text, "SELECT 1");
        assert_eq!(cmd.kind, CommandKind::Text);
        assert!(cmd.params.is_empty());
        assert!(cmd.timeout.is_none());
    }

    #[test]
    fn test_bind_preserves_order() {
        let cmd = SqlCommand::text("UPDATE t SET a = @a WHERE id = @id")
            .bind("a", json!(42))
            .bind("id", "row-1");
        assert_eq!(cmd.params.len(), 2);
        assert_eq!(cmd.params[0].name, "a");
        assert_eq!(cmd.params[1].value, json!("row-1"));
    }

    #[test]
    fn test_stored_procedure_kind() {
        let cmd = SqlCommand::stored_procedure("sp_cleanup").timeout(Duration::from_secs(5));
        assert_eq!(cmd.kind, CommandKind::StoredProcedure);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_from_str() {
        let cmd: SqlCommand = "SELECT * FROM users".into();
        assert_eq!(cmd.text, "SELECT * FROM users");
    }
}
