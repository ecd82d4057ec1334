//! 잎 질병 탐지 포트.
//!
//! 구현: `olivescan-network` crate (reqwest multipart)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::detection::{DetectionRequest, DetectionResult};

/// 원격 추론 서버에 이미지를 제출하는 탐지기
#[async_trait]
pub trait LeafDetector: Send + Sync {
    /// 이미지 1장 탐지
    ///
    /// 잘못된 서버 URL만 `Err(CoreError::Config)`로 반환한다.
    /// 전송/서버/응답 형식 오류는 `success == false`인 결과로 변환된다.
    async fn detect(&self, request: DetectionRequest) -> Result<DetectionResult, CoreError>;
}
