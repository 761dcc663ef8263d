//! `texcfg_core` is the engine behind the [texcfg](https://github.com/ifiokjr/texcfg) command line. It answers the questions a LaTeX build pipeline asks for every matrix job: what does the build configuration say, is that configuration complete, which engine compiles this document, does it need a second pass, and what are the cache key and commit message for this run.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Config file (YAML / JSON / TOML)
//!   → ConfigStore (reads and parses once per process into a ConfigTree)
//!   → ConfigBackend (native tree lookups, or `yq` when selected)
//!   → get / get_array / validate_config
//!
//! Document source (.tex)
//!   → classify_file (directive, font and script markers, second-pass signals)
//!   → DocumentDescriptor
//!
//! Resolved values + descriptor
//!   → render (cache keys, commit messages)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration discovery, parsing and the in-memory tree.
//! - [`backend`]: The [`ConfigBackend`] capability and its native and `yq` implementations.
//! - [`resolve`]: Dotted path resolution with defaults, and sequence resolution.
//! - [`schema`]: Required section and value checks.
//! - [`classify`]: Compiler selection and second-pass detection for LaTeX sources.
//! - [`template`]: `{placeholder}` substitution for cache keys and commit messages.
//! - [`discover`]: Finding the root documents of a project.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use texcfg_core::ConfigPath;
//! use texcfg_core::ConfigStore;
//! use texcfg_core::classify::classify_file;
//! use texcfg_core::resolve::get;
//! use texcfg_core::template::render;
//!
//! let store = ConfigStore::discover(Path::new(".")).unwrap();
//! let tree = store.tree().unwrap();
//! let year = get(tree, &ConfigPath::new("texlive.year"), Some("2024")).unwrap();
//!
//! let document = classify_file(Path::new("paper/main.tex"));
//! println!("{} ({} pass(es))", document.compiler, document.pass_count());
//!
//! let key = render("texlive-{year}-{os}", &[("year", year.as_str())]);
//! println!("{key}");
//! ```

pub use backend::*;
pub use config::*;
pub use error::*;

pub mod backend;
pub mod classify;
pub mod config;
pub mod discover;
#[allow(unused_assignments)]
mod error;
pub mod resolve;
pub mod schema;
pub mod template;

#[cfg(test)]
mod __fixtures;
