//! Storage module for flagbridge
//!
//! - `json`: JSON - 범용 파일 저장/로드 (설정, switch guard)

mod json;

// JSON Storage (범용)
pub use json::JsonStore;
