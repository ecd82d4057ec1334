//! 추론 서버 응답 파싱.
//!
//! ```json
//! {
//!   "detection_info": { "leaf_count": 2, "leaves": [{"class_name": "healthy", "confidence": 87.5}] },
//!   "image": "<base64>"
//! }
//! ```
//!
//! 파싱 실패는 에러가 아니라 `success == false`인 결과로 돌려준다.

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use olivescan_core::error::CoreError;
use olivescan_core::models::detection::{DetectionResult, LeafDetection, ResultImage};
use serde::{de, Deserialize, Deserializer};
use tracing::{debug, warn};

pub const EMPTY_RESPONSE: &str = "Empty response from server";
pub const INVALID_FORMAT: &str = "Invalid response format from server";

#[derive(Debug, Deserialize)]
struct DetectionInfo {
    #[serde(deserialize_with = "integral_count")]
    leaf_count: u32,
    leaves: Vec<RawLeaf>,
}

#[derive(Debug, Deserialize)]
struct RawLeaf {
    class_name: String,
    /// 0 ~ 100
    confidence: f64,
}

/// 정수 값을 가진 실수(`3.0`)도 개수로 받는다
fn integral_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Ok(value as u32)
    } else {
        Err(de::Error::custom(format!(
            "leaf_count is not a non-negative integer: {value}"
        )))
    }
}

/// 응답 본문을 탐지 결과로 변환
pub fn parse_detection_body(body: &str) -> DetectionResult {
    if body.trim().is_empty() {
        return DetectionResult::failed(EMPTY_RESPONSE);
    }

    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => return parse_failure(e),
    };

    let (Some(info), Some(image)) = (json.get("detection_info"), json.get("image")) else {
        warn!("응답 형식 오류: {}", truncate(body, 200));
        return DetectionResult::failed(INVALID_FORMAT);
    };

    match decode_fields(info, image) {
        Ok(result) => result,
        Err(e) => parse_failure(e),
    }
}

fn decode_fields(
    info: &serde_json::Value,
    image: &serde_json::Value,
) -> Result<DetectionResult, String> {
    let info = DetectionInfo::deserialize(info).map_err(|e| e.to_string())?;

    let encoded = image
        .as_str()
        .ok_or_else(|| "image is not a string".to_string())?;
    // MIME 스타일 줄바꿈이 섞여 와도 디코딩
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let image_bytes = B64.decode(compact).map_err(|e| e.to_string())?;

    let result_image = ResultImage::decode(image_bytes);
    if result_image.is_none() {
        warn!("결과 이미지 디코딩 실패: 이미지 없이 진행");
    }

    let detections: Vec<LeafDetection> = info
        .leaves
        .into_iter()
        .map(|leaf| LeafDetection::new(leaf.class_name, leaf.confidence / 100.0))
        .collect();

    debug!(
        leaf_count = info.leaf_count,
        detections = detections.len(),
        "탐지 응답 파싱 완료"
    );

    Ok(DetectionResult::succeeded(
        detections,
        info.leaf_count,
        result_image,
    ))
}

fn parse_failure(detail: impl std::fmt::Display) -> DetectionResult {
    let err = CoreError::Protocol(detail.to_string());
    warn!("응답 파싱 실패: {err}");
    DetectionResult::failed(err.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
