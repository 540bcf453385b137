//! The library code for the `reprise` static site generator. A run can be
//! broken down into three steps:
//!
//! 1. Parsing entries from dated source files on disk ([`crate::entry`]) and
//!    sorting them into a [`crate::catalog::Catalog`]
//! 2. Rendering the catalog into pages ([`crate::page`]) and Atom feeds
//!    ([`crate::feed`]) inside a staging directory
//! 3. Swapping the staging directory into the public location
//!    ([`crate::build`])
//!
//! Entry bodies are written in Markdown or reStructuredText
//! ([`crate::markup`]); the resulting HTML gets syntax-highlighting wrappers
//! ([`crate::highlight`]) and typographic punctuation
//! ([`crate::typography`]).
//!
//! Pages are rendered from Go-style templates. Every page template sees the
//! same flat set of variables, built by [`crate::context`], with the
//! variables that don't apply to a page set to nil.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod catalog;
pub mod config;
pub mod context;
pub mod entry;
pub mod feed;
pub mod highlight;
pub mod markup;
pub mod page;
pub mod typography;

#[cfg(test)]
pub(crate) mod test_helpers;
