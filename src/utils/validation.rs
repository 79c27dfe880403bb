use crate::api::error::AppError;
use std::path::Path;
use uuid::Uuid;

const MAX_FILENAME_BYTES: usize = 255;

/// Reduce a client supplied filename to a safe display name: last path
/// component only, reserved characters replaced, at most 255 bytes.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    // Browsers on Windows may send the full client path
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::BadRequest("No file selected".to_string()));
    }

    if filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Stripped directory components from upload name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' => '_',
            c => c,
        })
        .collect();

    if sanitized.len() <= MAX_FILENAME_BYTES {
        return Ok(sanitized);
    }

    // Shorten the stem so the extension, and with it the document type, survives
    let mut extension = extension_of(&sanitized);
    if extension.len() >= MAX_FILENAME_BYTES {
        extension.clear();
    }
    let stem = &sanitized[..sanitized.len() - extension.len()];
    let mut end = MAX_FILENAME_BYTES.saturating_sub(extension.len()).min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    Ok(format!("{}{}", &stem[..end], extension))
}

/// Extension of `name` including the leading dot, in its original case.
/// Returns "" when there is none or when it holds anything but ASCII
/// alphanumerics, so it is always safe to append to a stored filename.
pub fn extension_of(name: &str) -> String {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{ext}")
        }
        _ => String::new(),
    }
}

/// File identifiers are UUIDs; anything else never names a stored file.
pub fn is_valid_file_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_filename("C:\\Users\\me\\report.xlsx").unwrap(), "report.xlsx");
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("a|b?.docx").unwrap(), "a_b_.docx");
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_filename(&long).unwrap();
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_sanitize_truncation_keeps_extension() {
        let long = format!("{}.docx", "a".repeat(300));
        let out = sanitize_filename(&long).unwrap();
        assert_eq!(out.len(), 255);
        assert!(out.ends_with(".docx"));
        assert_eq!(extension_of(&out), ".docx");

        let wide = format!("{}.xlsx", "é".repeat(200));
        let out = sanitize_filename(&wide).unwrap();
        assert!(out.len() <= 255);
        assert!(out.ends_with(".xlsx"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.XLSX"), ".XLSX");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("weird.d\u{e9}x"), "");
    }

    #[test]
    fn test_file_id_validation() {
        assert!(is_valid_file_id(&Uuid::new_v4().to_string()));
        assert!(!is_valid_file_id("../config"));
        assert!(!is_valid_file_id(""));
    }
}
