//! 애플리케이션 설정 구조체.
//!
//! 추론 서버 URL, 표시 언어, 로컬 저장소 경로를 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드/저장된다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreError;
use crate::locale::Language;

/// 기본 서버 URL (에뮬레이터에서 호스트 루프백)
pub const DEFAULT_SERVER_URL: &str = "http://10.0.2.2:5000";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 서버 연결 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 일반 설정 (언어)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 서버 설정
// ============================================================

/// 추론 서버 연결 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 추론 서버 기본 URL (`/detect`가 뒤에 붙는다)
    #[serde(default = "default_server_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_server_url(),
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

/// 서버 URL 스킴 검증
///
/// `http://` 또는 `https://`로 시작하지 않으면 `CoreError::Config`.
pub fn validate_server_url(base_url: &str) -> Result<(), CoreError> {
    let trimmed = base_url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(CoreError::Config(format!("Invalid server URL: {base_url}")));
    }
    Ok(())
}

// ============================================================
// 일반 설정
// ============================================================

/// 일반 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// 표시 언어
    #[serde(default)]
    pub language: Language,
}

// ============================================================
// 저장소 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 데이터 디렉토리 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_server_url("http://10.0.2.2:5000").is_ok());
        assert!(validate_server_url("https://leaf.example.com").is_ok());
    }

    #[test]
    fn rejects_missing_scheme() {
        let err = validate_server_url("example.com").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(validate_server_url("ftp://example.com").is_err());
        assert!(validate_server_url("").is_err());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"general":{"language":"fr"}}"#).unwrap();
        assert_eq!(config.general.language, Language::Fr);
        assert_eq!(config.server.base_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn unknown_language_in_file_reads_as_english() {
        let config: AppConfig =
            serde_json::from_str(r#"{"general":{"language":"de"}}"#).unwrap();
        assert_eq!(config.general.language, Language::En);
    }
}
