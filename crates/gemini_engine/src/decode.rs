use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::fetch::FetchOutput;

/// How far into the body the XML declaration is looked for.
const DECLARATION_WINDOW: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes with {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

/// Decode a fetched body into UTF-8.
pub fn decode_output(output: &FetchOutput) -> Result<DecodedText, DecodeError> {
    decode_text(&output.bytes, output.metadata.content_type.as_deref())
}

/// Decode raw bytes into UTF-8 using: BOM -> Content-Type charset ->
/// XML declaration encoding -> chardetng fallback.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedText, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    if let Some(label) = xml_declared_encoding(bytes) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
        })
        .next()
}

/// `encoding="..."` from a leading `<?xml ...?>` declaration.
fn xml_declared_encoding(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let head = String::from_utf8_lossy(window);
    let head = head.trim_start();
    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &after[1..];
    Some(rest[..rest.find(quote)?].to_string())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedText, DecodeError> {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::DecodeFailure {
            encoding: enc.name().to_string(),
            message: "decoding error".into(),
        });
    }
    Ok(DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parameter_is_case_insensitive() {
        assert_eq!(
            extract_charset("text/xml; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".to_string())
        );
        assert_eq!(extract_charset("text/xml"), None);
    }

    #[test]
    fn xml_declaration_encoding_is_read() {
        let body = b"<?xml version=\"1.0\" encoding='windows-1252'?><a/>";
        assert_eq!(xml_declared_encoding(body), Some("windows-1252".to_string()));
        assert_eq!(xml_declared_encoding(b"<a/>"), None);
    }

    #[test]
    fn declared_latin1_is_decoded() {
        let mut body = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><t>".to_vec();
        body.push(0xE9);
        body.extend_from_slice(b"</t>");
        let decoded = decode_text(&body, None).unwrap();
        assert!(decoded.text.ends_with("<t>\u{e9}</t>"));
        assert_eq!(decoded.encoding_label, "windows-1252");
    }

    #[test]
    fn bom_wins_over_header() {
        let mut body = vec![0xEF, 0xBB, 0xBF];
        body.extend_from_slice("<t>\u{e9}</t>".as_bytes());
        let decoded = decode_text(&body, Some("text/xml; charset=iso-8859-1")).unwrap();
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert_eq!(decoded.text, "<t>\u{e9}</t>");
    }
}
