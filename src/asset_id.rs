//! Canonical asset identifiers derived from legacy upload URLs.
//!
//! WordPress stores uploads as `/wp-content/uploads/YYYY/MM/file.ext`; the
//! migrated assets live on the remote host as `MM/file` (month folder, no
//! extension). Both pipelines depend on this mapping being a pure function
//! of the URL, so nothing here reads configuration or keeps state.
//!
//! | Input | Output |
//! |-------|--------|
//! | `https://blog/wp-content/uploads/2021/07/cover.JPG` | `07/cover` |
//! | `https://host/img/logo.png` | `logo` |
//! | `https://host/files/banner.webp.png` | `banner` |

use regex::Regex;
use std::sync::LazyLock;

use crate::models::AssetId;

/// `.../<year>/<month>/<filename>` at the end of the URL.
static DATED_UPLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([0-9]{4})/([0-9]{2})/([^/]+)$").unwrap());

static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:jpg|jpeg|png|gif|webp)$").unwrap());

/// Derive the canonical asset id for a legacy upload URL.
///
/// When the URL ends in a dated upload path the id is `<month>/<basename>`;
/// otherwise it is the bare basename of the last path segment.
pub fn derive_asset_id(url: &str) -> AssetId {
    if let Some(caps) = DATED_UPLOAD.captures(url) {
        let month = &caps[2];
        let basename = strip_image_extension(&caps[3]);
        return AssetId::new(format!("{}/{}", month, basename));
    }

    let filename = url.rsplit('/').next().unwrap_or(url);
    AssetId::new(strip_image_extension(filename))
}

/// Remove every trailing recognized image extension, case-insensitively.
///
/// `photo.png.jpg` becomes `photo`, so applying this twice is the same as
/// applying it once.
pub fn strip_image_extension(filename: &str) -> &str {
    let mut name = filename;
    while let Some(m) = IMAGE_EXTENSION.find(name) {
        name = &name[..m.start()];
    }
    name
}
