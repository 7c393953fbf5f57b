use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniform type identifier attached to shared content, e.g. `public.jpeg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeIdentifier(String);

/// Direct supertypes for the identifiers the extension knows about.
const CONFORMANCE: &[(&str, &str)] = &[
    ("public.jpeg", "public.image"),
    ("public.png", "public.image"),
    ("public.heic", "public.image"),
    ("public.heif", "public.image"),
    ("public.tiff", "public.image"),
    ("com.compuserve.gif", "public.image"),
    ("com.microsoft.bmp", "public.image"),
    ("org.webmproject.webp", "public.image"),
    ("public.image", "public.data"),
    ("public.utf8-plain-text", "public.plain-text"),
    ("public.plain-text", "public.text"),
    ("public.text", "public.data"),
    ("public.file-url", "public.url"),
    ("public.url", "public.data"),
];

impl TypeIdentifier {
    pub const IMAGE: &'static str = "public.image";
    pub const DATA: &'static str = "public.data";

    pub fn new(identifier: impl Into<String>) -> Self {
        Self(identifier.into())
    }

    pub fn image() -> Self {
        Self::new(Self::IMAGE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier equals `other` or descends from it.
    pub fn conforms_to(&self, other: &TypeIdentifier) -> bool {
        let mut current = self.0.as_str();
        loop {
            if current == other.0 {
                return true;
            }
            match CONFORMANCE.iter().find(|(child, _)| *child == current) {
                Some((_, parent)) => current = parent,
                None => return false,
            }
        }
    }

    /// Best-effort identifier for a file extension. Unknown extensions map to `public.data`.
    pub fn from_extension(extension: &str) -> Self {
        let id = match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => "public.jpeg",
            "png" => "public.png",
            "heic" => "public.heic",
            "heif" => "public.heif",
            "tif" | "tiff" => "public.tiff",
            "gif" => "com.compuserve.gif",
            "bmp" => "com.microsoft.bmp",
            "webp" => "org.webmproject.webp",
            "txt" | "text" => "public.plain-text",
            _ => Self::DATA,
        };
        Self::new(id)
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
