//! # photometa
//!
//! Namespace resolution and reconciliation for photo metadata.
//!
//! The same logical field (tags, star rating, caption) is stored under many
//! names: every camera maker, editing application and standards body has its
//! own tag, value encoding and numeric scale. photometa keeps an ordered,
//! configurable catalog of those names per field and decides which stored
//! value wins when several disagree.
//!
//! # Architecture
//!
//! ```text
//!              ┌────────────┐      ┌──────────────┐
//! dump.json ──▶│ TagStore   │─────▶│ sidecar      │◀── dump.json.xmp
//!              └────────────┘      │ reconcile    │
//!                                  └──────┬───────┘
//!                                         ▼
//!        NamespaceCatalog ───────▶ FieldResolver / FieldWriter
//!                                         │
//!                                   rating · gps · orientation codecs
//! ```
//!
//! The engine never parses image files. It works on a [`store::TagStore`]
//! (get/set/remove by container and key) that a codec fills in;
//! [`store::MemoryTagStore`] is the in-memory implementation, serialized as
//! JSON for dumps and sidecars.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | `TagStore` trait, raw values, in-memory store |
//! | [`namespace`] | `NamespaceEntry` and its categories, styles and encodings |
//! | [`catalog`] | Ordered per-category read/write lists, built-in defaults, shared snapshots |
//! | [`rating`] | Star count ↔ external scale conversion |
//! | [`gps`] | Decimal ↔ rational ↔ XMP string coordinate codec, GPS tag read/write |
//! | [`orientation`] | Orientation matrix algebra and Exif orientation codes |
//! | [`acdsee`] | ACDSee category XML ↔ tag paths |
//! | [`resolve`] | `FieldResolver`: first usable value in priority order |
//! | [`write`] | `FieldWriter`: fan-out writes, bag add/remove |
//! | [`sidecar`] | Sidecar discovery, field-group merges, writing modes |
//! | [`batch`] | Parallel resolution of many dumps |
//! | [`config`] | `photometa.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `flexi_logger` bootstrap for the binary |
//!
//! # Design Decisions
//!
//! ## Absence Is Not an Error
//!
//! A field no namespace carries resolves to `None`. Errors are reserved for
//! malformed values and configuration defects, and a malformed value in one
//! namespace never hides a good value in the next: it is reported in
//! [`resolve::Resolved::issues`] and resolution moves on.
//!
//! ## Redundant Writes
//!
//! Writes go to every enabled entry of the write list, so that older or
//! simpler readers still find the value in the namespace they know. Unify mode
//! collapses this to the first enabled read entry.
//!
//! ## Immutable Catalog Snapshots
//!
//! A catalog is a plain value. Long-running hosts share it as an
//! `Arc<NamespaceCatalog>` through [`catalog::SharedCatalog`], which swaps the
//! whole snapshot on change; resolutions in flight keep the snapshot they
//! started with.

pub mod acdsee;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gps;
pub mod logging;
pub mod namespace;
pub mod orientation;
pub mod output;
pub mod rating;
pub mod resolve;
pub mod sidecar;
pub mod store;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;
