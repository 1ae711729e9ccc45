//! Server-rendered pages.
//!
//! The whole UI is one HTML page rendered from a controller [`Snapshot`].
//! Every control is a plain form, so the page works without JavaScript;
//! HTMX (`hx-boost`) only upgrades navigation when it is available.
//!
//! - [`templates`]: Template environment
//! - [`view`]: Serializable view model handed to the templates
//!
//! [`Snapshot`]: crate::runtime::Snapshot

pub mod templates;
pub mod view;

pub use templates::Templates;
pub use view::PageView;
