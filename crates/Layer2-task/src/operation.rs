//! Tool operations - typed argv for the external provisioning tool
//!
//! The tool is invoked as `<tool> <operation> <args...>`. Building the argv
//! from an enum keeps callers from assembling flags by hand and lets the
//! log show a redacted form of credential operations.

use flagbridge_foundation::{
    Error, Result, ENV_NONINTERACTIVE, ENV_PROFILE_ID, ENV_PROFILE_NAME,
};
use std::fmt;
use std::str::FromStr;

/// Scope for extension install / uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    None,
    Missing,
    All,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::None => "none",
            Scope::Missing => "missing",
            Scope::All => "all",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Scope::None),
            "missing" => Ok(Scope::Missing),
            "all" => Ok(Scope::All),
            other => Err(Error::InvalidInput(format!(
                "unknown scope '{}', expected none, missing or all",
                other
            ))),
        }
    }
}

/// Which parts of the configuration `config` should sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigSelection {
    pub settings: bool,
    pub keybindings: bool,
    pub tasks: bool,
    pub extensions: bool,
}

impl ConfigSelection {
    pub fn all() -> Self {
        Self {
            settings: true,
            keybindings: true,
            tasks: true,
            extensions: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.settings || self.keybindings || self.tasks || self.extensions)
    }

    fn flags(&self) -> Vec<String> {
        [
            (self.settings, "--settings"),
            (self.keybindings, "--keybindings"),
            (self.tasks, "--tasks"),
            (self.extensions, "--extensions"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, flag)| flag.to_string())
        .collect()
    }
}

/// An operation understood by the external tool
#[derive(Clone, PartialEq, Eq)]
pub enum ToolOperation {
    /// Sync selected configuration files
    Config(ConfigSelection),
    /// Reconcile installed extensions
    Extensions { uninstall: Scope, install: Scope },
    /// Set the user's password
    Passwd { value: String, confirm: String },
    /// Set the privileged (root) password; gated by policy
    RootPasswd { value: String, confirm: String },
    /// Anything else the tool understands
    Custom { name: String, args: Vec<String> },
}

impl ToolOperation {
    /// Configuration merge applied after a profile change
    pub fn config_merge() -> Self {
        ToolOperation::Config(ConfigSelection {
            settings: true,
            keybindings: true,
            tasks: true,
            extensions: false,
        })
    }

    /// Extension reconciliation applied after a profile change
    pub fn extension_reconcile() -> Self {
        ToolOperation::Extensions {
            uninstall: Scope::None,
            install: Scope::Missing,
        }
    }

    /// Operation name (first argv element)
    pub fn name(&self) -> &str {
        match self {
            ToolOperation::Config(_) => "config",
            ToolOperation::Extensions { .. } => "extensions",
            ToolOperation::Passwd { .. } => "passwd",
            ToolOperation::RootPasswd { .. } => "root-passwd",
            ToolOperation::Custom { name, .. } => name,
        }
    }

    /// Whether the operation needs the privileged-credential policy
    pub fn is_privileged(&self) -> bool {
        matches!(self, ToolOperation::RootPasswd { .. })
    }

    /// Full argv (operation name first), validated
    pub fn argv(&self) -> Result<Vec<String>> {
        let mut argv = vec![self.name().to_string()];
        match self {
            ToolOperation::Config(selection) => {
                if selection.is_empty() {
                    return Err(Error::InvalidInput(
                        "config needs at least one of settings, keybindings, tasks, extensions"
                            .to_string(),
                    ));
                }
                argv.extend(selection.flags());
            }
            ToolOperation::Extensions { uninstall, install } => {
                argv.extend([
                    "--uninstall".to_string(),
                    uninstall.to_string(),
                    "--install".to_string(),
                    install.to_string(),
                ]);
            }
            ToolOperation::Passwd { value, confirm }
            | ToolOperation::RootPasswd { value, confirm } => {
                if value.is_empty() {
                    return Err(Error::InvalidInput("password must not be empty".to_string()));
                }
                if value != confirm {
                    return Err(Error::InvalidInput(
                        "password and confirmation do not match".to_string(),
                    ));
                }
                argv.extend([value.clone(), confirm.clone()]);
            }
            ToolOperation::Custom { name, args } => {
                if name.trim().is_empty() {
                    return Err(Error::InvalidInput("operation name is empty".to_string()));
                }
                argv.extend(args.iter().cloned());
            }
        }
        Ok(argv)
    }
}

/// Redacted form, safe for logs
impl fmt::Display for ToolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOperation::Passwd { .. } | ToolOperation::RootPasswd { .. } => {
                write!(f, "{} ******** ********", self.name())
            }
            _ => match self.argv() {
                Ok(argv) => f.write_str(&argv.join(" ")),
                Err(_) => f.write_str(self.name()),
            },
        }
    }
}

impl fmt::Debug for ToolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToolOperation({})", self)
    }
}

// ============================================================================
// RunContext - 자식 프로세스 환경
// ============================================================================

/// Active profile passed to the child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileIdentity {
    pub id: String,
    pub name: String,
}

/// Contextual environment for one invocation
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub profile: Option<ProfileIdentity>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.profile = Some(ProfileIdentity {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Environment overlay applied on top of the inherited environment
    pub fn env_overlay(&self) -> Vec<(String, String)> {
        let mut env = vec![(ENV_NONINTERACTIVE.to_string(), "1".to_string())];
        if let Some(profile) = &self.profile {
            env.push((ENV_PROFILE_ID.to_string(), profile.id.clone()));
            env.push((ENV_PROFILE_NAME.to_string(), profile.name.clone()));
        }
        env
    }
}
