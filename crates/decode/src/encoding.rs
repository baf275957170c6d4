use crate::DecodeError;

/// Result of turning raw file bytes into text.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    /// Label of the encoding actually used ("utf-8", "utf-16le", "latin-1").
    pub encoding: String,
    /// Heuristic confidence in [0.0, 1.0]; 1.0 when pinned or unambiguous.
    pub confidence: f32,
}

/// Decode file bytes to text. A pinned label from decoder metadata skips
/// detection entirely; otherwise detection is BOM sniffing, then UTF-8
/// validation, then a Latin-1 fallback whose confidence reflects how much
/// of the file is plain ASCII. Deterministic for identical input.
pub fn decode_bytes(bytes: &[u8], pinned: Option<&str>) -> Result<DecodedText, DecodeError> {
    if let Some(label) = pinned {
        let text = decode_as(bytes, label)?;
        return Ok(DecodedText {
            text,
            encoding: canonical_label(label)
                .expect("decode_as accepted the label")
                .to_string(),
            confidence: 1.0,
        });
    }

    // BOM markers are authoritative.
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Ok(DecodedText {
            text: String::from_utf8_lossy(&bytes[3..]).into_owned(),
            encoding: "utf-8".into(),
            confidence: 1.0,
        });
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Ok(DecodedText {
            text: decode_utf16(&bytes[2..], true),
            encoding: "utf-16le".into(),
            confidence: 1.0,
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Ok(DecodedText {
            text: decode_utf16(&bytes[2..], false),
            encoding: "utf-16be".into(),
            confidence: 1.0,
        });
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(DecodedText {
            text: text.to_string(),
            encoding: "utf-8".into(),
            confidence: 1.0,
        });
    }

    // Not UTF-8: fall back to Latin-1, which decodes any byte sequence.
    // Confidence is the fraction of lines that are pure ASCII; those are
    // identical under every Latin encoding, the rest is a guess.
    let total_lines = bytes.split(|&b| b == b'\n').count();
    let ascii_lines = bytes
        .split(|&b| b == b'\n')
        .filter(|line| line.is_ascii())
        .count();
    let confidence = if total_lines == 0 {
        0.0
    } else {
        0.9 * (ascii_lines as f32 / total_lines as f32)
    };

    let text = decode_latin1(bytes);
    tracing::info!(
        "detected encoding: latin-1 (confidence: {confidence:.2}, {ascii_lines}/{total_lines} ASCII lines)"
    );
    Ok(DecodedText {
        text,
        encoding: "latin-1".into(),
        confidence,
    })
}

fn canonical_label(label: &str) -> Option<&'static str> {
    match label.trim().to_lowercase().replace('_', "-").as_str() {
        "utf-8" | "utf8" => Some("utf-8"),
        "utf-16le" | "utf16le" => Some("utf-16le"),
        "utf-16be" | "utf16be" => Some("utf-16be"),
        "latin-1" | "latin1" | "iso-8859-1" => Some("latin-1"),
        _ => None,
    }
}

fn decode_as(bytes: &[u8], label: &str) -> Result<String, DecodeError> {
    match canonical_label(label) {
        Some("utf-8") => {
            let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
            Ok(String::from_utf8_lossy(body).into_owned())
        }
        Some("utf-16le") => {
            let body = bytes.strip_prefix(&[0xFF, 0xFE][..]).unwrap_or(bytes);
            Ok(decode_utf16(body, true))
        }
        Some("utf-16be") => {
            let body = bytes.strip_prefix(&[0xFE, 0xFF][..]).unwrap_or(bytes);
            Ok(decode_utf16(body, false))
        }
        Some("latin-1") => Ok(decode_latin1(bytes)),
        _ => Err(DecodeError::UnsupportedEncoding(label.to_string())),
    }
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8() {
        let out = decode_bytes(b"Date,Amount\n01/15/2024,100.00\n", None).unwrap();
        assert_eq!(out.encoding, "utf-8");
        assert_eq!(out.confidence, 1.0);
        assert!(out.text.starts_with("Date,Amount"));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Date,Amount\n");
        let out = decode_bytes(&bytes, None).unwrap();
        assert_eq!(out.encoding, "utf-8");
        assert!(out.text.starts_with("Date"));
    }

    #[test]
    fn utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Date,Amount".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let out = decode_bytes(&bytes, None).unwrap();
        assert_eq!(out.encoding, "utf-16le");
        assert_eq!(out.text, "Date,Amount");
    }

    #[test]
    fn latin1_fallback() {
        // "CAFÉ" with É as 0xC9 is invalid UTF-8.
        let bytes = b"Date,Description\n01/15/2024,CAF\xC9\n";
        let out = decode_bytes(bytes, None).unwrap();
        assert_eq!(out.encoding, "latin-1");
        assert!(out.text.contains("CAFÉ"));
        assert!(out.confidence < 1.0);
    }

    #[test]
    fn detection_is_deterministic() {
        let bytes = b"a,b\n1,caf\xE9\n2,nai\xEFve\n";
        let first = decode_bytes(bytes, None).unwrap();
        let second = decode_bytes(bytes, None).unwrap();
        assert_eq!(first.encoding, second.encoding);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn pinned_encoding_skips_detection() {
        let bytes = b"Date,Description\n01/15/2024,CAF\xC9\n";
        let out = decode_bytes(bytes, Some("latin-1")).unwrap();
        assert_eq!(out.encoding, "latin-1");
        assert_eq!(out.confidence, 1.0);
    }

    #[test]
    fn pinned_label_aliases() {
        let out = decode_bytes(b"a,b\n", Some("ISO-8859-1")).unwrap();
        assert_eq!(out.encoding, "latin-1");
    }

    #[test]
    fn unknown_pinned_label_is_error() {
        assert!(matches!(
            decode_bytes(b"a,b\n", Some("ebcdic")),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }
}
