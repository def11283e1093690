//! Profile host capability
//!
//! The host (editor) owns profiles. Some hosts have no profile API at all,
//! some only accept one of the argument forms. The capability is decided
//! once at startup and passed around as `ProfileCapability`.

use async_trait::async_trait;
use flagbridge_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A profile known to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub id: String,
    pub name: String,
}

impl ProfileInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Exact match on id or trimmed name
    pub fn matches(&self, key: &str) -> bool {
        let key = key.trim();
        self.name.trim() == key || self.id == key
    }
}

/// Initial contents of a newly created profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileBaseline {
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl ProfileBaseline {
    /// Empty configuration
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Structured argument form `{ name }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub name: String,
}

/// Argument passed to a host profile operation
///
/// Every variant carries a name; there is no argument-less form, so the
/// host's interactive picker can never be opened from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileArgument {
    Named(String),
    Structured(ProfileRef),
}

impl ProfileArgument {
    /// Both forms for a name, string form first
    pub fn forms(name: &str) -> [ProfileArgument; 2] {
        [
            ProfileArgument::Named(name.to_string()),
            ProfileArgument::Structured(ProfileRef {
                name: name.to_string(),
            }),
        ]
    }

    pub fn name(&self) -> &str {
        match self {
            ProfileArgument::Named(name) => name,
            ProfileArgument::Structured(r) => &r.name,
        }
    }

    pub fn form(&self) -> ArgumentForm {
        match self {
            ProfileArgument::Named(_) => ArgumentForm::Named,
            ProfileArgument::Structured(_) => ArgumentForm::Structured,
        }
    }
}

/// Argument form without the payload, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentForm {
    Named,
    Structured,
}

/// Host operations the switcher probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileCommand {
    /// Select an existing profile
    Switch,
    /// Create and select in one step
    CreateAndSwitch,
    /// Create only
    Create,
}

impl fmt::Display for ProfileCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProfileCommand::Switch => "switch",
            ProfileCommand::CreateAndSwitch => "create-and-switch",
            ProfileCommand::Create => "create",
        })
    }
}

/// Profile management API of the host
///
/// Implementations return `Error::CapabilityUnsupported` for operations or
/// argument forms they do not understand.
#[async_trait]
pub trait ProfileHost: Send + Sync {
    /// Host name for logs
    fn name(&self) -> &str;

    /// Whether the host has any profile API
    fn supports_profiles(&self) -> bool {
        true
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileInfo>>;

    async fn active_profile(&self) -> Result<Option<ProfileInfo>>;

    async fn create_profile(&self, name: &str, baseline: &ProfileBaseline) -> Result<ProfileInfo>;

    async fn execute(&self, command: ProfileCommand, argument: &ProfileArgument) -> Result<()>;
}

/// Profile support, decided once at startup
#[derive(Clone)]
pub enum ProfileCapability {
    Supported(Arc<dyn ProfileHost>),
    Unsupported { reason: String },
}

impl ProfileCapability {
    pub fn detect(host: Option<Arc<dyn ProfileHost>>) -> Self {
        match host {
            Some(host) if host.supports_profiles() => ProfileCapability::Supported(host),
            Some(host) => ProfileCapability::Unsupported {
                reason: format!("host '{}' has no profile API", host.name()),
            },
            None => ProfileCapability::Unsupported {
                reason: "no profile host available".to_string(),
            },
        }
    }

    pub fn host(&self) -> Option<&Arc<dyn ProfileHost>> {
        match self {
            ProfileCapability::Supported(host) => Some(host),
            ProfileCapability::Unsupported { .. } => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, ProfileCapability::Supported(_))
    }

    /// Host or `CapabilityUnsupported`
    pub fn require(&self) -> Result<&Arc<dyn ProfileHost>> {
        match self {
            ProfileCapability::Supported(host) => Ok(host),
            ProfileCapability::Unsupported { reason } => {
                Err(Error::CapabilityUnsupported(reason.clone()))
            }
        }
    }
}

impl fmt::Debug for ProfileCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileCapability::Supported(host) => {
                f.debug_tuple("Supported").field(&host.name()).finish()
            }
            ProfileCapability::Unsupported { reason } => f
                .debug_struct("Unsupported")
                .field("reason", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Legacy;

    #[async_trait]
    impl ProfileHost for Legacy {
        fn name(&self) -> &str {
            "legacy"
        }

        fn supports_profiles(&self) -> bool {
            false
        }

        async fn list_profiles(&self) -> Result<Vec<ProfileInfo>> {
            Ok(Vec::new())
        }

        async fn active_profile(&self) -> Result<Option<ProfileInfo>> {
            Ok(None)
        }

        async fn create_profile(&self, _: &str, _: &ProfileBaseline) -> Result<ProfileInfo> {
            Err(Error::CapabilityUnsupported("create".into()))
        }

        async fn execute(&self, _: ProfileCommand, _: &ProfileArgument) -> Result<()> {
            Err(Error::CapabilityUnsupported("execute".into()))
        }
    }

    #[test]
    fn test_detect() {
        let cap = ProfileCapability::detect(None);
        assert!(!cap.is_supported());
        assert!(matches!(cap.require(), Err(Error::CapabilityUnsupported(_))));

        let cap = ProfileCapability::detect(Some(Arc::new(Legacy)));
        match cap {
            ProfileCapability::Unsupported { reason } => assert!(reason.contains("legacy")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_argument_forms() {
        let [named, structured] = ProfileArgument::forms("team-default");
        assert_eq!(named.form(), ArgumentForm::Named);
        assert_eq!(structured.form(), ArgumentForm::Structured);
        assert_eq!(structured.name(), "team-default");
    }

    #[test]
    fn test_profile_matches() {
        let p = ProfileInfo::new("p-1", "team-default");
        assert!(p.matches(" team-default "));
        assert!(p.matches("p-1"));
        assert!(!p.matches("Team-Default"));
    }
}
