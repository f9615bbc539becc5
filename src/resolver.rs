//! Featured-image resolution for a single post.
//!
//! A post is looked up by slug first and by title second; the first key that
//! has a binding decides the attachment, even if that attachment turns out
//! to be missing from the export.

use thiserror::Error;

use crate::asset_id::derive_asset_id;
use crate::legacy_export::LegacyExport;
use crate::models::AssetId;

/// Why a post has no featured asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvedReference {
    #[error("no featured image bound to this post")]
    NoBinding,

    #[error("featured image points at unknown attachment {attachment_id}")]
    MissingAttachment { attachment_id: String },
}

/// Resolves posts against the tables of one parsed export.
#[derive(Debug, Clone, Copy)]
pub struct FeaturedAssetResolver<'a> {
    export: &'a LegacyExport,
}

impl<'a> FeaturedAssetResolver<'a> {
    pub fn new(export: &'a LegacyExport) -> Self {
        Self { export }
    }

    /// Resolve a post's featured image to its canonical asset id.
    pub fn resolve(&self, slug: &str, title: Option<&str>) -> Result<AssetId, UnresolvedReference> {
        let bindings = &self.export.bindings;
        let attachment_id = bindings
            .get(slug)
            .or_else(|| title.and_then(|t| bindings.get(t)))
            .ok_or(UnresolvedReference::NoBinding)?;

        let attachment = self.export.attachment(attachment_id).ok_or_else(|| {
            UnresolvedReference::MissingAttachment {
                attachment_id: attachment_id.to_string(),
            }
        })?;

        Ok(derive_asset_id(&attachment.url))
    }
}
