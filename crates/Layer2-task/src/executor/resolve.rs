//! Executable resolution
//!
//! Order: explicit path from config, fixed install candidates, the fallback
//! shell script, then a PATH lookup as last resort. The first hit wins;
//! nothing is retried.

use flagbridge_foundation::{BridgeConfig, Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a resolved command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Explicit,
    Candidate,
    SearchPath,
    Fallback,
}

/// Fallback script invoked as `sh <script> <sub_arg> <argv...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackScript {
    pub script: PathBuf,
    pub sub_arg: String,
}

/// A command ready to be spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: PathBuf,
    /// Arguments placed before the operation argv
    pub prefix_args: Vec<String>,
    pub source: ResolutionSource,
}

/// Locates the external tool
#[derive(Debug, Clone, Default)]
pub struct ExecutableResolver {
    explicit: Option<PathBuf>,
    candidates: Vec<PathBuf>,
    search_name: Option<String>,
    fallback: Option<FallbackScript>,
}

impl ExecutableResolver {
    /// Resolver with nothing configured; `resolve` always fails
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        let fallback = config.fallback_script.clone().map(|script| FallbackScript {
            script,
            sub_arg: config.fallback_arg().to_string(),
        });
        Self {
            explicit: config.tool_path.clone(),
            candidates: config.tool_candidates(),
            search_name: Some(config.tool_name().to_string()),
            fallback,
        }
    }

    pub fn explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn candidate(mut self, path: impl Into<PathBuf>) -> Self {
        self.candidates.push(path.into());
        self
    }

    pub fn search_path(mut self, name: impl Into<String>) -> Self {
        self.search_name = Some(name.into());
        self
    }

    pub fn fallback(mut self, script: impl Into<PathBuf>, sub_arg: impl Into<String>) -> Self {
        self.fallback = Some(FallbackScript {
            script: script.into(),
            sub_arg: sub_arg.into(),
        });
        self
    }

    pub fn resolve(&self) -> Result<ResolvedCommand> {
        if let Some(path) = self.explicit.as_deref().filter(|p| is_file(p)) {
            debug!("Resolved tool from explicit path {}", path.display());
            return Ok(direct(path, ResolutionSource::Explicit));
        }

        if let Some(path) = self.candidates.iter().find(|p| is_file(p)) {
            debug!("Resolved tool from install candidate {}", path.display());
            return Ok(direct(path, ResolutionSource::Candidate));
        }

        if let Some(fallback) = self.fallback.as_ref().filter(|f| is_file(&f.script)) {
            debug!("Resolved tool via fallback script {}", fallback.script.display());
            return Ok(ResolvedCommand {
                program: PathBuf::from("sh"),
                prefix_args: vec![
                    fallback.script.to_string_lossy().into_owned(),
                    fallback.sub_arg.clone(),
                ],
                source: ResolutionSource::Fallback,
            });
        }

        if let Some(path) = self
            .search_name
            .as_deref()
            .and_then(|name| which::which(name).ok())
        {
            debug!("Resolved tool from PATH: {}", path.display());
            return Ok(direct(&path, ResolutionSource::SearchPath));
        }

        Err(Error::ExecutableNotFound(self.describe()))
    }

    /// What was tried, for the error message
    fn describe(&self) -> String {
        let mut tried: Vec<String> = Vec::new();
        if let Some(path) = &self.explicit {
            tried.push(path.display().to_string());
        }
        tried.extend(self.candidates.iter().map(|p| p.display().to_string()));
        if let Some(fallback) = &self.fallback {
            tried.push(fallback.script.display().to_string());
        }
        if let Some(name) = &self.search_name {
            tried.push(format!("$PATH/{}", name));
        }
        if tried.is_empty() {
            "no tool location configured".to_string()
        } else {
            format!("tried {}", tried.join(", "))
        }
    }
}

fn is_file(path: &Path) -> bool {
    path.is_file()
}

fn direct(path: &Path, source: ResolutionSource) -> ResolvedCommand {
    ResolvedCommand {
        program: path.to_path_buf(),
        prefix_args: Vec::new(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_nothing_configured() {
        let err = ExecutableResolver::new().resolve().unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
    }

    #[test]
    fn test_missing_explicit_path() {
        let err = ExecutableResolver::new()
            .explicit("/definitely/not/here/provision")
            .resolve()
            .unwrap_err();
        match err {
            Error::ExecutableNotFound(msg) => assert!(msg.contains("/definitely/not/here")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_wins_over_candidates() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("explicit");
        let candidate = dir.path().join("candidate");
        std::fs::write(&explicit, "").unwrap();
        std::fs::write(&candidate, "").unwrap();

        let resolved = ExecutableResolver::new()
            .explicit(&explicit)
            .candidate(&candidate)
            .resolve()
            .unwrap();
        assert_eq!(resolved.source, ResolutionSource::Explicit);
        assert_eq!(resolved.program, explicit);
    }

    #[test]
    fn test_first_existing_candidate() {
        let dir = tempdir().unwrap();
        let second = dir.path().join("second");
        std::fs::write(&second, "").unwrap();

        let resolved = ExecutableResolver::new()
            .explicit(dir.path().join("missing"))
            .candidate(dir.path().join("first"))
            .candidate(&second)
            .resolve()
            .unwrap();
        assert_eq!(resolved.source, ResolutionSource::Candidate);
        assert_eq!(resolved.program, second);
    }

    #[test]
    fn test_directory_is_not_an_executable() {
        let dir = tempdir().unwrap();
        let err = ExecutableResolver::new()
            .explicit(dir.path())
            .resolve()
            .unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
    }

    #[test]
    fn test_fallback_script() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("provision.sh");
        std::fs::write(&script, "exit 0\n").unwrap();

        let resolved = ExecutableResolver::new()
            .search_path("flagbridge-no-such-tool-xyz")
            .fallback(&script, "tool")
            .resolve()
            .unwrap();
        assert_eq!(resolved.source, ResolutionSource::Fallback);
        assert_eq!(resolved.program, PathBuf::from("sh"));
        assert_eq!(resolved.prefix_args[1], "tool");
    }

    #[cfg(unix)]
    #[test]
    fn test_fallback_wins_over_path() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("provision.sh");
        std::fs::write(&script, "exit 0\n").unwrap();

        // `sh` is always on PATH
        let resolver = ExecutableResolver::new().search_path("sh");
        assert_eq!(resolver.resolve().unwrap().source, ResolutionSource::SearchPath);

        let resolved = resolver.fallback(&script, "tool").resolve().unwrap();
        assert_eq!(resolved.source, ResolutionSource::Fallback);
    }
}
