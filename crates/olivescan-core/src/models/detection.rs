//! 탐지 요청/결과 모델.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;

/// 분류된 잎 하나 (신뢰도 0.0 ~ 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafDetection {
    /// 분류 이름 (예: "healthy", "peacock_spot")
    pub class_name: String,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
}

impl LeafDetection {
    pub fn new(class_name: impl Into<String>, confidence: f64) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
        }
    }
}

/// 서버가 돌려준 주석 이미지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultImage {
    /// 수신한 그대로의 인코딩된 바이트
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ResultImage {
    /// 바이트를 이미지로 해석
    ///
    /// 알 수 없는 형식이면 `None` (탐지 자체는 실패로 보지 않는다).
    pub fn decode(bytes: Vec<u8>) -> Option<Self> {
        let decoded = image::load_from_memory(&bytes).ok()?;
        Some(Self {
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    /// 이미지 MIME 타입 추정
    pub fn content_type(&self) -> Option<&'static str> {
        image::guess_format(&self.bytes)
            .ok()
            .map(|f| f.to_mime_type())
    }
}

/// 이미지 1장 제출 결과
///
/// `success == false`이면 `detections`는 비어 있고 `error`가 채워져 있다.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub success: bool,
    pub detections: Vec<LeafDetection>,
    pub result_image: Option<ResultImage>,
    pub leaf_count: u32,
    pub error: Option<String>,
}

impl DetectionResult {
    /// 성공 결과
    pub fn succeeded(
        detections: Vec<LeafDetection>,
        leaf_count: u32,
        result_image: Option<ResultImage>,
    ) -> Self {
        Self {
            success: true,
            detections,
            result_image,
            leaf_count,
            error: None,
        }
    }

    /// 실패 결과 (복구 가능한 결과로, 에러가 아니다)
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            detections: Vec::new(),
            result_image: None,
            leaf_count: 0,
            error: Some(error.into()),
        }
    }
}

/// 업로드할 원본 이미지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// MIME 타입 (예: "image/png")
    pub content_type: String,
}

impl ImagePayload {
    /// 바이트에서 생성: MIME 타입은 내용으로 추정
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let content_type = image::guess_format(&bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
            .to_string();
        Self {
            bytes,
            content_type,
        }
    }

    /// 파일에서 읽기
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let bytes = std::fs::read(path).map_err(|e| {
            CoreError::Image(format!("이미지 파일 읽기 실패: {}: {}", path.display(), e))
        })?;
        Ok(Self::from_bytes(bytes))
    }
}

/// 탐지 요청: 사용자 동작마다 생성되고 호출이 끝나면 버려진다
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image: ImagePayload,
    /// 추론 서버 기본 URL
    pub base_url: String,
}

impl DetectionRequest {
    pub fn new(image: ImagePayload, base_url: impl Into<String>) -> Self {
        Self {
            image,
            base_url: base_url.into(),
        }
    }
}
