//! Policy input for privileged operations
//!
//! A YAML file read best-effort. Only a top-level `allow_root_password: true`
//! permits the privileged credential operation; a missing file, a parse
//! failure or any other value means "not permitted".

use flagbridge_foundation::{Error, Result};
use flagbridge_task::ToolOperation;
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

pub const ROOT_PASSWORD_KEY: &str = "allow_root_password";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub allow_root_password: bool,
}

impl Policy {
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                debug!("Policy file {} not readable: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let value: Value = match serde_yaml::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                debug!("Policy file not valid YAML: {}", e);
                return Self::default();
            }
        };
        let allow_root_password = value
            .get(ROOT_PASSWORD_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            allow_root_password,
        }
    }

    pub fn permits(&self, operation: &ToolOperation) -> bool {
        !operation.is_privileged() || self.allow_root_password
    }

    /// `PermissionDenied` for operations the policy does not permit
    pub fn authorize(&self, operation: &ToolOperation) -> Result<()> {
        if self.permits(operation) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "'{}' is disabled by policy ({} is not true)",
                operation.name(),
                ROOT_PASSWORD_KEY
            )))
        }
    }
}
