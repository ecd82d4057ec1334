//! # olivescan-network
//!
//! 추론 서버 네트워크 어댑터.
//! 원본 이미지를 JPEG로 재인코딩하여 `POST {base_url}/detect`로 업로드하고,
//! JSON/Base64 응답을 `DetectionResult`로 변환한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use olivescan_core::models::detection::{DetectionRequest, ImagePayload};
//! use olivescan_core::ports::detector::LeafDetector;
//! use olivescan_network::detection_client::HttpLeafDetector;
//!
//! let detector = HttpLeafDetector::new()?;
//! let image = ImagePayload::from_path(path)?;
//! let result = detector.detect(DetectionRequest::new(image, "http://10.0.2.2:5000")).await?;
//! ```

pub mod detection_client;
pub mod encoder;
pub mod response;
