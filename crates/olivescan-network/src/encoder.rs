//! JPEG 업로드 인코더.
//!
//! 원본 형식과 관계없이 서버에는 JPEG(품질 90)로 보낸다.

use image::codecs::jpeg::JpegEncoder;
use olivescan_core::error::CoreError;
use tracing::debug;

/// 업로드 JPEG 품질
pub const UPLOAD_JPEG_QUALITY: u8 = 90;

/// 이미지 바이트를 JPEG로 재인코딩
///
/// 알파 채널은 버린다 (JPEG 미지원).
pub fn encode_jpeg(source: &[u8], quality: u8) -> Result<Vec<u8>, CoreError> {
    let decoded = image::load_from_memory(source)
        .map_err(|e| CoreError::Image(format!("이미지 디코딩 실패: {e}")))?;
    let rgb = decoded.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| CoreError::Image(format!("JPEG 인코딩 실패: {e}")))?;

    debug!(
        width = rgb.width(),
        height = rgb.height(),
        raw = source.len(),
        encoded = buf.len(),
        "업로드 이미지 JPEG 인코딩"
    );
    Ok(buf)
}

/// 블로킹 풀에서 JPEG 재인코딩
pub async fn encode_jpeg_async(source: Vec<u8>, quality: u8) -> Result<Vec<u8>, CoreError> {
    tokio::task::spawn_blocking(move || encode_jpeg(&source, quality))
        .await
        .map_err(|e| CoreError::Internal(format!("인코딩 작업 조인 실패: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_with_alpha() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 6, image::Rgba([10, 200, 30, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn png_becomes_jpeg() {
        let jpeg = encode_jpeg(&png_with_alpha(), UPLOAD_JPEG_QUALITY).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn garbage_is_image_error() {
        let result = encode_jpeg(b"definitely not an image", UPLOAD_JPEG_QUALITY);
        assert!(matches!(result, Err(CoreError::Image(_))));
    }

    #[tokio::test]
    async fn async_encode() {
        let jpeg = encode_jpeg_async(png_with_alpha(), 50).await.unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }
}
