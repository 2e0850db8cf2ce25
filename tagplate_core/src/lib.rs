//! `tagplate_core` adds XML-like component tags to
//! [`minijinja`](https://docs.rs/minijinja) templates. Authors write
//! `<Card title="x">body</Card>` inside ordinary templates and the tags are
//! rewritten into `component(...)` calls before the templates are compiled.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Requested template name
//!   -> Assembler (layouts, folder files, referenced templates, shared fragments)
//!   -> Scanner (tokens with offsets and line numbers)
//!   -> Tag parser (tag heads and their attributes)
//!   -> Block resolver (pairs start and end tags, innermost first)
//!   -> Rewriter (replaces every block with a `component(...)` call)
//!   -> minijinja Environment, cached per (layout, name)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: `tagplate.toml` loading, engine options and render data files.
//! - [`document`]: decides which templates are compiled together.
//! - [`lexer`] and [`tokens`]: the tokenizer.
//!
//! ## Key Types
//!
//! - [`Engine`]: renders templates under a root directory.
//! - [`Tag`] and [`Block`]: parsed component tags.
//! - [`ComponentRegistry`]: component definitions from the components folder.
//! - [`TemplateCache`]: compiled units shared between renders.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagplate_core::Engine;
//!
//! let engine = Engine::from_config("templates").unwrap();
//! let html = engine
//! 	.render("profile", serde_json::json!({ "name": "Ayo" }))
//! 	.unwrap();
//! println!("{html}");
//! ```

pub use blocks::*;
pub use cache::*;
pub use components::*;
pub use config::*;
pub use document::Assembler;
pub use document::Document;
pub use document::LayoutDirective;
pub use document::SourceKind;
pub use document::TemplateSource;
pub use engine::*;
pub use error::*;
pub use parser::*;
pub use rewriter::*;

mod blocks;
mod cache;
mod components;
pub mod config;
pub mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
pub mod lexer;
mod parser;
mod rewriter;
pub mod tokens;

#[cfg(test)]
mod __fixtures;
