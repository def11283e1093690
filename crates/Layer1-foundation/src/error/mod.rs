//! Error types for flagbridge
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// flagbridge 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 외부 도구 실행 관련
    // ========================================================================
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Process failed: {operation} exited with {}", describe_exit(.exit_code))]
    ProcessFailed {
        operation: String,
        exit_code: Option<i32>,
    },

    // ========================================================================
    // Host capability 관련
    // ========================================================================
    #[error("Capability unsupported: {0}")]
    CapabilityUnsupported(String),

    // ========================================================================
    // Flag file 관련
    // ========================================================================
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    // ========================================================================
    // 설정 / 저장소 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 조용히 무시해야 하는 에러인지 확인 (부분 쓰기 등)
    pub fn is_silent(&self) -> bool {
        matches!(self, Error::MalformedCommand(_))
    }

    /// ProcessFailed 생성 헬퍼
    pub fn process_failed(operation: impl Into<String>, exit_code: Option<i32>) -> Self {
        Error::ProcessFailed {
            operation: operation.into(),
            exit_code,
        }
    }

    /// MalformedCommand 생성 헬퍼
    pub fn malformed(content: impl AsRef<str>) -> Self {
        let content = content.as_ref();
        let preview: String = content.chars().take(64).collect();
        Error::MalformedCommand(preview)
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
