//! OliveScan 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입으로 에러를 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 설정, 전송, 프로토콜, 저장소 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류 (잘못된 서버 URL 등): 네트워크 호출 전에 실패
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 네트워크 에러 (연결 실패, 본문 읽기 실패)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서버가 2xx 이외의 상태 코드를 반환
    #[error("Server returned {status}: {body}")]
    Server {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 (원문 그대로)
        body: String,
    },

    /// 응답 형식 오류 (필드 누락, 잘못된 JSON/Base64)
    #[error("Error parsing server response: {0}")]
    Protocol(String),

    /// 원본 이미지 읽기/인코딩 실패
    #[error("이미지 에러: {0}")]
    Image(String),

    /// 로컬 저장소 에러 (SQLite 열기, 쿼리, 마이그레이션)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "DetectionHistory")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 탐지 경계에서 결과로 변환하지 않고 호출자에게 그대로 전달해야 하는 에러인지
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::Config(_))
    }
}
