//! Output generation.
//!
//! # Submodules
//!
//! - [`html`]: Renders scraped articles into the static signage board and
//!   writes it to disk
//!
//! # Output
//!
//! A single self-contained file (default `index.html`). Only the article
//! images are loaded remotely; styles are inline and the page reloads itself
//! every hour.

pub mod html;
