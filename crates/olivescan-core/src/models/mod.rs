//! OliveScan 도메인 모델.
//!
//! 탐지 요청/결과와 로컬 기록 레코드를 정의한다.

pub mod detection;
pub mod history;
