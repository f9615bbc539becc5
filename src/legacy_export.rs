//! WordPress WXR export parsing.
//!
//! Builds the two lookup tables the extraction pipeline needs from a
//! WordPress export file:
//!
//! - attachment id → attachment URL (from `attachment` items)
//! - post slug / post title → attachment id (from the `_thumbnail_id`
//!   postmeta entry of `post` items)
//!
//! # Format
//!
//! ```xml
//! <rss xmlns:wp="http://wordpress.org/export/1.2/">
//!   <channel>
//!     <item>
//!       <title>Launch Day</title>
//!       <wp:post_id>7</wp:post_id>
//!       <wp:post_name><![CDATA[launch-day]]></wp:post_name>
//!       <wp:post_type><![CDATA[post]]></wp:post_type>
//!       <wp:postmeta>
//!         <wp:meta_key><![CDATA[_thumbnail_id]]></wp:meta_key>
//!         <wp:meta_value><![CDATA[42]]></wp:meta_value>
//!       </wp:postmeta>
//!     </item>
//!   </channel>
//! </rss>
//! ```
//!
//! The `wp` prefix is resolved by namespace URI, so any WXR version under
//! `http://wordpress.org/export/` is accepted. Items of other types (pages,
//! nav menu items, ...) are ignored. Partial records are skipped, but XML
//! that cannot be parsed aborts the whole parse.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ExportError;
use crate::models::{Attachment, ThumbnailBindings};

/// Postmeta key that marks a post's featured image.
pub const THUMBNAIL_META_KEY: &str = "_thumbnail_id";

const WP_NAMESPACE_PREFIX: &[u8] = b"http://wordpress.org/export/";

/// Lookup tables parsed from a legacy export. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct LegacyExport {
    pub attachments: HashMap<String, Attachment>,
    pub bindings: ThumbnailBindings,
    pub stats: ExportStats,
}

/// Counters collected while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub items: usize,
    pub attachments: usize,
    pub featured_posts: usize,
    /// Binding keys that were rebound to a different attachment id.
    pub overwritten_bindings: usize,
}

impl LegacyExport {
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.attachments.get(id)
    }
}

/// Read and parse the export at `path`.
pub fn load_export(path: &Path) -> Result<LegacyExport, ExportError> {
    let xml = std::fs::read(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_export(&xml)
}

/// Which text field of the current record is being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    PostId,
    PostName,
    PostType,
    AttachmentUrl,
    MetaKey,
    MetaValue,
}

#[derive(Debug, Default)]
struct MetaEntry {
    key: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Default)]
struct ItemRecord {
    title: Option<String>,
    post_id: Option<String>,
    post_name: Option<String>,
    post_type: Option<String>,
    attachment_url: Option<String>,
    meta: Vec<MetaEntry>,
}

impl ItemRecord {
    fn set(&mut self, field: Field, text: String, meta: Option<&mut MetaEntry>) {
        match field {
            Field::Title => self.title = Some(text),
            Field::PostId => self.post_id = Some(text),
            Field::PostName => self.post_name = Some(text),
            Field::PostType => self.post_type = Some(text),
            Field::AttachmentUrl => self.attachment_url = Some(text),
            Field::MetaKey => {
                if let Some(m) = meta {
                    m.key = Some(text);
                }
            }
            Field::MetaValue => {
                if let Some(m) = meta {
                    m.value = Some(text);
                }
            }
        }
    }

    fn thumbnail_id(&self) -> Option<&str> {
        self.meta
            .iter()
            .find(|m| m.key.as_deref().map(str::trim) == Some(THUMBNAIL_META_KEY))
            .and_then(|m| m.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Streaming state for one pass over the document.
#[derive(Default)]
struct ExportBuilder {
    export: LegacyExport,
    depth: usize,
    saw_root: bool,
    item: Option<(usize, ItemRecord)>,
    meta: Option<MetaEntry>,
    capture: Option<Field>,
    text: String,
}

impl ExportBuilder {
    fn open(&mut self, in_wp: bool, local: &[u8]) {
        self.depth += 1;
        self.saw_root = true;

        let Some(item_depth) = self.item.as_ref().map(|(depth, _)| *depth) else {
            if !in_wp && local == b"item" {
                self.item = Some((self.depth, ItemRecord::default()));
            }
            return;
        };
        let direct_child = self.depth == item_depth + 1;

        let field = match (in_wp, local) {
            (false, b"title") if direct_child => Some(Field::Title),
            (true, b"post_id") => Some(Field::PostId),
            (true, b"post_name") => Some(Field::PostName),
            (true, b"post_type") => Some(Field::PostType),
            (true, b"attachment_url") => Some(Field::AttachmentUrl),
            (true, b"postmeta") => {
                self.meta = Some(MetaEntry::default());
                None
            }
            (true, b"meta_key") if self.meta.is_some() => Some(Field::MetaKey),
            (true, b"meta_value") if self.meta.is_some() => Some(Field::MetaValue),
            _ => None,
        };
        if field.is_some() {
            self.capture = field;
            self.text.clear();
        }
    }

    fn capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn text(&mut self, text: &str) {
        if self.capturing() {
            self.text.push_str(text);
        }
    }

    fn close(&mut self, in_wp: bool, local: &[u8]) {
        if let Some(field) = self.capture.take() {
            let text = std::mem::take(&mut self.text);
            if let Some((_, item)) = self.item.as_mut() {
                item.set(field, text, self.meta.as_mut());
            }
        } else if in_wp && local == b"postmeta" {
            if let (Some(meta), Some((_, item))) = (self.meta.take(), self.item.as_mut()) {
                item.meta.push(meta);
            }
        } else if !in_wp && local == b"item" {
            if let Some((item_depth, record)) = self.item.take() {
                if item_depth == self.depth {
                    self.finish_item(record);
                } else {
                    self.item = Some((item_depth, record));
                }
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish_item(&mut self, record: ItemRecord) {
        self.export.stats.items += 1;
        let post_type = record
            .post_type
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        match post_type.as_str() {
            "attachment" => self.add_attachment(record),
            "post" => self.add_post(record),
            _ => {}
        }
    }

    fn add_attachment(&mut self, record: ItemRecord) {
        let id = record.post_id.as_deref().map(str::trim).unwrap_or_default();
        let url = record
            .attachment_url
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if id.is_empty() || url.is_empty() {
            debug!(id, "skipping attachment without id or url");
            return;
        }
        self.export.stats.attachments += 1;
        self.export.attachments.insert(
            id.to_string(),
            Attachment {
                id: id.to_string(),
                url: url.to_string(),
            },
        );
    }

    fn add_post(&mut self, record: ItemRecord) {
        let Some(thumbnail_id) = record.thumbnail_id() else {
            return;
        };
        self.export.stats.featured_posts += 1;

        let slug = record.post_name.as_deref().filter(|s| !s.is_empty());
        let title = record.title.as_deref().filter(|s| !s.is_empty());
        for key in [slug, title].into_iter().flatten() {
            if let Some(previous) = self.export.bindings.bind(key, thumbnail_id) {
                if previous != thumbnail_id {
                    self.export.stats.overwritten_bindings += 1;
                    warn!(
                        key,
                        previous = %previous,
                        current = thumbnail_id,
                        "featured image binding overwritten; keeping the last one"
                    );
                }
            }
        }
    }
}

fn is_wp_namespace(ns: &ResolveResult) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if uri.starts_with(WP_NAMESPACE_PREFIX))
}

/// Parse a WXR document held in memory.
pub fn parse_export(xml: &[u8]) -> Result<LegacyExport, ExportError> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut builder = ExportBuilder::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                let in_wp = is_wp_namespace(&ns);
                builder.open(in_wp, e.local_name().as_ref());
            }
            Ok((ns, Event::Empty(e))) => {
                let in_wp = is_wp_namespace(&ns);
                builder.open(in_wp, e.local_name().as_ref());
                builder.close(in_wp, e.local_name().as_ref());
            }
            Ok((_, Event::Text(t))) if builder.capturing() => {
                let text = t.unescape().map_err(|e| ExportError::Malformed {
                    message: e.to_string(),
                })?;
                builder.text(&text);
            }
            Ok((_, Event::CData(c))) => {
                builder.text(&String::from_utf8_lossy(&c));
            }
            Ok((ns, Event::End(e))) => {
                let in_wp = is_wp_namespace(&ns);
                builder.close(in_wp, e.local_name().as_ref());
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExportError::Malformed {
                    message: e.to_string(),
                })
            }
        }
        buf.clear();
    }

    if !builder.saw_root {
        return Err(ExportError::Malformed {
            message: "document has no root element".to_string(),
        });
    }
    if builder.depth != 0 {
        return Err(ExportError::Malformed {
            message: format!("unexpected end of document ({} unclosed elements)", builder.depth),
        });
    }

    debug!(
        items = builder.export.stats.items,
        attachments = builder.export.stats.attachments,
        featured_posts = builder.export.stats.featured_posts,
        "parsed legacy export"
    );
    Ok(builder.export)
}
