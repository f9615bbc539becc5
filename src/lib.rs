//! # Asset Reconcile
//!
//! Keeps featured-image references consistent between a WordPress export,
//! a Jekyll markdown corpus, and a Cloudinary account.
//!
//! Two independent pipelines share the [`models::AssetId`] concept and the
//! document corpus:
//!
//! ## Architecture
//!
//! ```text
//!  extract
//! ┌──────────────┐   ┌────────────┐   ┌──────────────┐
//! │ WXR export   │──▶│  Resolver  │──▶│ Front matter │──▶ documents
//! │ (attachments │   │ slug/title │   │  featured_   │
//! │  + bindings) │   │  → AssetId │   │  image: id   │
//! └──────────────┘   └────────────┘   └──────────────┘
//!
//!  audit
//! ┌──────────────┐
//! │  documents   │──▶ ReferenceIndex ─┐
//! └──────────────┘                    ├──▶ missing / unused
//! ┌──────────────┐                    │
//! │  Cloudinary  │──▶ RemoteInventory ┘
//! └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! asset-reconcile extract --dry-run     # preview front-matter updates
//! asset-reconcile extract               # write them
//! asset-reconcile audit --output audit.json
//! asset-reconcile resolve launch-day --title "Launch Day"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed errors |
//! | [`legacy_export`] | WXR export parser |
//! | [`asset_id`] | Canonical id from a legacy upload URL |
//! | [`resolver`] | Post → featured asset id |
//! | [`front_matter`] | Front-matter block model |
//! | [`corpus`] | Document discovery |
//! | [`featured`] | Extraction pipeline |
//! | [`references`] | Delivery-URL extraction and indexing |
//! | [`inventory`] | Paginated remote inventory |
//! | [`reconcile`] | Missing / unused set difference |
//! | [`audit`] | Audit pipeline |

pub mod asset_id;
pub mod audit;
pub mod config;
pub mod corpus;
pub mod error;
pub mod featured;
pub mod front_matter;
pub mod inventory;
pub mod legacy_export;
pub mod models;
pub mod reconcile;
pub mod references;
pub mod resolver;
