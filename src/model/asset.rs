//! Image asset keys and content types.

use image::ImageFormat;

pub const RAW_PREFIX: &str = "raw/";
pub const PROCESSED_PREFIX: &str = "processed/";

/// The two supported image encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageKind {
    #[default]
    Jpeg,
    Png,
}

impl ImageKind {
    /// `image/png` selects PNG; anything else, including nothing, is JPEG.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if essence.eq_ignore_ascii_case("image/png") {
            Self::Png
        } else {
            Self::Jpeg
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.content_type())
    }
}

/// Key for a fresh upload: `raw/<collection>/<file_id>.<ext>`.
pub fn raw_key(collection: &str, file_id: &str, kind: ImageKind) -> String {
    format!(
        "{RAW_PREFIX}{}/{file_id}.{}",
        collection.trim_matches('/'),
        kind.extension()
    )
}

/// Swap the leading `raw/` for `processed/`. `None` outside the raw namespace.
pub fn processed_key(raw_key: &str) -> Option<String> {
    raw_key
        .strip_prefix(RAW_PREFIX)
        .map(|suffix| format!("{PROCESSED_PREFIX}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_selection_defaults_to_jpeg() {
        assert_eq!(ImageKind::from_content_type(Some("image/png")), ImageKind::Png);
        assert_eq!(ImageKind::from_content_type(Some("IMAGE/PNG; q=1")), ImageKind::Png);
        assert_eq!(ImageKind::from_content_type(Some("image/jpeg")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_content_type(Some("image/gif")), ImageKind::Jpeg);
        assert_eq!(ImageKind::from_content_type(None), ImageKind::Jpeg);
    }

    #[test]
    fn raw_key_layout() {
        assert_eq!(
            raw_key("todo-images", "abc", ImageKind::Png),
            "raw/todo-images/abc.png"
        );
        assert_eq!(
            raw_key("/nested/dir/", "abc", ImageKind::Jpeg),
            "raw/nested/dir/abc.jpg"
        );
    }

    #[test]
    fn processed_key_keeps_suffix() {
        assert_eq!(
            processed_key("raw/todo-images/a b.jpg").as_deref(),
            Some("processed/todo-images/a b.jpg")
        );
        assert_eq!(processed_key("processed/x.jpg"), None);
        assert_eq!(processed_key("rawish/x.jpg"), None);
    }
}
