use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::ApiError;

/// 10 MB cap on request bodies and on decoded photos.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Fallback when the bytes match no known signature.
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Decode the text form of a photo: plain base64, or a data URL such as
/// `data:image/jpeg;base64,/9j/...`. Whitespace inside the payload is ignored.
pub fn decode_photo_text(input: &str) -> Result<Vec<u8>, ApiError> {
    let trimmed = input.trim();
    let is_data_url = trimmed
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
    let payload = if is_data_url {
        trimmed
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| ApiError::invalid("photo data URL has no payload"))?
    } else {
        trimmed
    };

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(ApiError::invalid("photo is required"));
    }
    if compact.len() / 4 * 3 > MAX_PHOTO_BYTES + 3 {
        return Err(photo_too_large());
    }

    let bytes = B64
        .decode(compact.as_bytes())
        .map_err(|_| ApiError::invalid("photo is not valid base64"))?;
    check_photo_bytes(bytes)
}

/// Validate raw photo bytes from a binary upload.
pub fn check_photo_bytes(bytes: Vec<u8>) -> Result<Vec<u8>, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::invalid("photo is required"));
    }
    if bytes.len() > MAX_PHOTO_BYTES {
        return Err(photo_too_large());
    }
    Ok(bytes)
}

pub fn encode_photo(bytes: &[u8]) -> String {
    B64.encode(bytes)
}

/// Content type for the photo response, from magic bytes.
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xff, 0xd8, 0xff, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

fn photo_too_large() -> ApiError {
    ApiError::invalid(format!("photo exceeds {} bytes", MAX_PHOTO_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x01];

    #[test]
    fn strips_data_url_prefix() {
        let text = format!("data:image/png;base64,{}", encode_photo(PIXEL));
        assert_eq!(decode_photo_text(&text).unwrap(), PIXEL);
    }

    #[test]
    fn data_url_scheme_is_case_insensitive() {
        let text = format!("DATA:image/png;base64,{}", encode_photo(PIXEL));
        assert_eq!(decode_photo_text(&text).unwrap(), PIXEL);
        let mixed = format!("Data:image/png;base64,{}", encode_photo(PIXEL));
        assert_eq!(decode_photo_text(&mixed).unwrap(), PIXEL);
    }

    #[test]
    fn accepts_bare_base64_with_line_breaks() {
        let encoded = encode_photo(PIXEL);
        let (head, tail) = encoded.split_at(4);
        let wrapped = format!("{head}\n{tail}\n");
        assert_eq!(decode_photo_text(&wrapped).unwrap(), PIXEL);
    }

    #[test]
    fn garbage_is_invalid_input() {
        assert!(matches!(
            decode_photo_text("data:image/png;base64,@@@not-base64@@@"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            decode_photo_text("data:image/png;base64"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(decode_photo_text("   "), Err(ApiError::InvalidInput(_))));
        assert!(matches!(
            decode_photo_text("data:image/png;base64,"),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn enforces_size_cap() {
        assert!(check_photo_bytes(vec![1u8; MAX_PHOTO_BYTES]).is_ok());
        assert!(check_photo_bytes(vec![1u8; MAX_PHOTO_BYTES + 1]).is_err());
        assert!(check_photo_bytes(Vec::new()).is_err());

        let oversized = encode_photo(&vec![0u8; MAX_PHOTO_BYTES + 16]);
        assert!(decode_photo_text(&oversized).is_err());
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_content_type(PIXEL), "image/png");
        assert_eq!(sniff_content_type(&[0xff, 0xd8, 0xff, 0xe0]), "image/jpeg");
        assert_eq!(sniff_content_type(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_content_type(b"RIFF\x10\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_content_type(b"??"), "image/png");
    }
}
