//! Final file names for committed downloads

use mime::Mime;
use url::Url;

/// Used when the URL path has no usable last segment
const FALLBACK_NAME: &str = "index";

/// Accepted extensions for each known image type; the first is preferred
fn image_extensions(subtype: &str) -> &'static [&'static str] {
    match subtype {
        "gif" => &[".gif"],
        "jpeg" => &[".jpeg", ".jpg"],
        "png" => &[".png"],
        "tiff" => &[".tiff"],
        _ => &[],
    }
}

/// Extensions accepted for a `Content-Type` header value.
///
/// Parameters such as `; charset=binary` are ignored. Unknown or malformed
/// types yield no extensions.
pub fn extensions_for(content_type: &str) -> &'static [&'static str] {
    let Ok(media_type) = content_type.parse::<Mime>() else {
        return &[];
    };

    if media_type.type_() != mime::IMAGE {
        return &[];
    }
    image_extensions(&media_type.subtype().as_str().to_ascii_lowercase())
}

/// Replace every character outside `[0-9A-Za-z_.-]` with `_`.
///
/// Keeps path separators and shell metacharacters out of file names.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitized last segment of the URL path
pub fn base_name(url: &Url) -> String {
    let last = url.path().rsplit('/').next().unwrap_or_default();
    let name = sanitize(last);

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// Destination file name for `url` served with `content_type`.
///
/// Known image types get their preferred extension appended unless the
/// name already ends with one of the accepted ones.
pub fn file_name(url: &Url, content_type: Option<&str>) -> String {
    let name = base_name(url);
    let extensions = content_type.map(extensions_for).unwrap_or_default();

    let Some(preferred) = extensions.first() else {
        return name;
    };

    let lowered = name.to_ascii_lowercase();
    if extensions.iter().any(|ext| lowered.ends_with(ext)) {
        name
    } else {
        format!("{name}{preferred}")
    }
}
