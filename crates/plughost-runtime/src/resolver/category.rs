//! Content categories and MIME types for extension files.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// What kind of extension content a file is, inferred from its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    /// Files under `admin/`.
    Admin,
    /// Files under `widgets/`.
    Widget,
    /// Files under `layouts/`.
    Layout,
    /// Files under `pages/` or `routes/`.
    Page,
    /// Files under `assets/`.
    Asset,
    /// Anything else.
    Component,
}

impl ContentCategory {
    /// Infers the category from the first recognised directory segment.
    /// The file name itself never decides the category.
    pub fn from_path(relative: &Path) -> Self {
        let mut dirs = relative.components().collect::<Vec<_>>();
        dirs.pop();
        dirs.into_iter()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .find_map(|segment| match segment {
                "admin" => Some(Self::Admin),
                "widgets" => Some(Self::Widget),
                "layouts" => Some(Self::Layout),
                "pages" | "routes" => Some(Self::Page),
                "assets" => Some(Self::Asset),
                _ => None,
            })
            .unwrap_or(Self::Component)
    }

    /// Lowercase label, as sent in the `X-Content-Category` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Widget => "widget",
            Self::Layout => "layout",
            Self::Page => "page",
            Self::Asset => "asset",
            Self::Component => "component",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess MIME type from a file path extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "application/octet-stream";
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "md" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" | "jsx" => "application/javascript",
        "ts" | "tsx" => "application/typescript",
        "json" => "application/json",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}
