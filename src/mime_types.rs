use mime_guess::Mime;

// Format names reported by ImageMagick that do not match a file extension.
const IDENTIFY_ALIASES: &[(&str, &str)] = &[
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("tiff64", "image/tiff"),
];

pub fn for_format(token: &str) -> Option<String> {
    let normalized = token.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Some((_, mime)) = IDENTIFY_ALIASES
        .iter()
        .find(|(format, _)| *format == normalized)
    {
        return Some((*mime).to_string());
    }
    mime_guess::from_ext(&normalized)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Reduces a `Content-Type` value to its `type/subtype` essence.
///
/// Returns `None` for empty values, values that are not `type/subtype`, and
/// wildcards such as `*/*`.
pub fn normalize(value: &str) -> Option<String> {
    let essence = value.split(';').next().unwrap_or_default().trim();
    let mime = essence.parse::<Mime>().ok()?;
    let (kind, subtype) = (mime.type_().as_str(), mime.subtype().as_str());
    if kind.is_empty() || subtype.is_empty() || kind == "*" || subtype == "*" {
        return None;
    }
    Some(mime.essence_str().to_ascii_lowercase())
}
