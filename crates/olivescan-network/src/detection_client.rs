//! 추론 서버 탐지 클라이언트.
//!
//! `LeafDetector` 포트 구현. 재시도/타임아웃 재정의 없이 요청 1회.

use async_trait::async_trait;
use olivescan_core::config::validate_server_url;
use olivescan_core::error::CoreError;
use olivescan_core::models::detection::{DetectionRequest, DetectionResult};
use olivescan_core::ports::detector::LeafDetector;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::encoder::{encode_jpeg_async, UPLOAD_JPEG_QUALITY};
use crate::response::parse_detection_body;

/// multipart 필드 이름
const IMAGE_FIELD: &str = "image";
/// 업로드 파일 이름
const IMAGE_FILE_NAME: &str = "image.jpg";
/// 탐지 엔드포인트 경로
const DETECT_PATH: &str = "/detect";

/// HTTP 탐지 클라이언트: `LeafDetector` 포트 구현
///
/// 서버 URL은 요청마다 받는다 (설정에서 런타임 변경 가능).
#[derive(Debug, Clone)]
pub struct HttpLeafDetector {
    client: reqwest::Client,
}

impl HttpLeafDetector {
    /// 기본 전송 설정으로 생성
    pub fn new() -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;
        Ok(Self::with_client(client))
    }

    /// 외부에서 구성한 클라이언트 사용
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `{base_url}/detect` 엔드포인트 구성
    ///
    /// 스킴이 http/https가 아니거나 URL로 해석되지 않으면 `CoreError::Config`.
    pub fn endpoint(base_url: &str) -> Result<String, CoreError> {
        validate_server_url(base_url)?;
        let base = base_url.trim().trim_end_matches('/');
        let endpoint = format!("{base}{DETECT_PATH}");
        url::Url::parse(&endpoint)
            .map_err(|e| CoreError::Config(format!("Invalid server URL: {base_url} ({e})")))?;
        Ok(endpoint)
    }

    /// 이미지 제출 (에러 타입 보존)
    ///
    /// - `Config`: 잘못된 서버 URL (네트워크 호출 전)
    /// - `Image`: 원본 이미지 인코딩 실패
    /// - `Network`: 전송 실패
    /// - `Server`: 2xx 이외 상태 코드
    ///
    /// 응답 본문 파싱 실패는 `Ok(success == false)`로 돌려준다.
    pub async fn submit(&self, request: DetectionRequest) -> Result<DetectionResult, CoreError> {
        let endpoint = Self::endpoint(&request.base_url)?;

        let source_len = request.image.bytes.len();
        let jpeg = encode_jpeg_async(request.image.bytes, UPLOAD_JPEG_QUALITY).await?;

        let part = Part::bytes(jpeg)
            .file_name(IMAGE_FILE_NAME)
            .mime_str("image/jpeg")
            .map_err(|e| CoreError::Internal(format!("multipart 구성 실패: {e}")))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        debug!(
            endpoint = %endpoint,
            source_type = %request.image.content_type,
            source_size = source_len,
            "탐지 요청 전송"
        );

        let response = self
            .client
            .post(&endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("탐지 요청 실패: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("응답 본문 읽기 실패: {e}")))?;

        debug!(status = %status, body_size = body.len(), "탐지 응답 수신");

        if !status.is_success() {
            return Err(CoreError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(parse_detection_body(&body))
    }
}

#[async_trait]
impl LeafDetector for HttpLeafDetector {
    async fn detect(&self, request: DetectionRequest) -> Result<DetectionResult, CoreError> {
        match self.submit(request).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                warn!("탐지 실패: {e}");
                Ok(DetectionResult::failed(e.to_string()))
            }
        }
    }
}
