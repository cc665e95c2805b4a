use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lazy_static::lazy_static;

use crate::error::ApiError;

lazy_static! {
    /// 视觉模型可以接受的图片类型
    pub static ref SUPPORTED_IMAGE_TYPES: HashSet<&'static str> = [
        "image/png",
        "image/jpeg",
        "image/jpg",
        "image/gif",
        "image/webp",
    ]
    .into_iter()
    .collect();
}

const FALLBACK_MIME: &str = "image/png";

/// 解码后的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// declared 为客户端声明的类型，没有声明时按文件头判断
    pub fn from_bytes(bytes: Vec<u8>, declared: Option<&str>) -> Result<Self, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::Decode("image payload is empty".to_string()));
        }
        let mime = match declared.map(str::trim).filter(|m| !m.is_empty()) {
            Some(declared) => {
                let declared = declared.to_ascii_lowercase();
                if !SUPPORTED_IMAGE_TYPES.contains(declared.as_str()) {
                    return Err(ApiError::UnsupportedImageType {
                        mime: declared,
                        supported: supported_types(),
                    });
                }
                // image/jpg 不是标准写法
                if declared == "image/jpg" {
                    "image/jpeg".to_string()
                } else {
                    declared
                }
            }
            None => sniff_mime(&bytes).unwrap_or(FALLBACK_MIME).to_string(),
        };
        Ok(DecodedImage { mime, bytes })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// 去掉 data URI 前缀并解码 base64 内容
pub fn decode_image(raw: &str) -> Result<DecodedImage, ApiError> {
    let raw = raw.trim();
    let (declared, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                ApiError::Decode("data URI is missing the ',' separator".to_string())
            })?;
            let mut parts = header.split(';');
            let mime = parts.next().unwrap_or_default();
            if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(ApiError::Decode("data URI is not base64 encoded".to_string()));
            }
            (Some(mime), payload)
        }
        None => (None, raw),
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    DecodedImage::from_bytes(bytes, declared)
}

/// 根据文件头判断图片类型
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn supported_types() -> String {
    let mut types: Vec<&str> = SUPPORTED_IMAGE_TYPES.iter().copied().collect();
    types.sort_unstable();
    types.join(", ")
}
