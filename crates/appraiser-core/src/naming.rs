//! Deterministic names for stored collateral photos

use chrono::NaiveDate;

use crate::models::CollateralClass;

const DEFAULT_EXTENSION: &str = "jpg";

/// Build `{individual_id}_{CLASS}_{YYYYMMDD}_{title-slug}.{ext}`.
pub fn derive_photo_filename(
    individual_id: &str,
    class: &CollateralClass,
    capture_date: NaiveDate,
    title: &str,
    extension: &str,
) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        slug(individual_id),
        slug(&class.tag().to_uppercase()),
        capture_date.format("%Y%m%d"),
        slug(title),
        normalize_extension(extension)
    )
}

/// Lower-case the extension and strip a leading dot; empty becomes `jpg`.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Map an image MIME type to a file extension, falling back to `jpg`.
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase());

    match essence.as_deref() {
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/heic") => "heic",
        Some("image/heif") => "heif",
        Some("image/gif") => "gif",
        _ => DEFAULT_EXTENSION,
    }
}

// Keeps ASCII alphanumerics and '-', collapses everything else into single underscores.
fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_separator = false;

    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}
