//! Filesystem side of the server.
//!
//! Everything the server exposes lives under a single [`RootDir`]. Request
//! paths are resolved against it into [`Resource`]s, and directories are
//! rendered as a [`Listing`] of their immediate children.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        AssetService          │
//! └──────────────┬───────────────┘
//!                │ request path
//!                ▼
//! ┌──────────────────────────────┐     ┌───────────────────┐
//! │  RootDir::resolve            │────▶│ Listing::read     │
//! │  (decode, normalize, contain)│     │ (dirs only)       │
//! └──────────────┬───────────────┘     └───────────────────┘
//!                │
//!                ▼
//!        read-only directory tree
//! ```

mod listing;
mod resolver;

pub use listing::{EntryKind, Listing, ListingEntry};
pub use resolver::{Resource, ResourceKind, RootDir};
