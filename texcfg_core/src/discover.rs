use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::ConfigBackend;
use crate::ConfigPath;
use crate::TexcfgError;
use crate::TexcfgResult;

/// Include pattern used when `file_patterns.include` is empty or absent.
pub const DEFAULT_INCLUDE_PATTERN: &str = "**/*.tex";

/// Marker that distinguishes a root document from an included fragment.
const DOCUMENT_CLASS_MARKER: &str = "\\documentclass";

/// Which files under the project root are compilable documents.
///
/// ```yaml
/// file_patterns:
///   include: ["papers/**/*.tex"]
///   exclude: ["drafts/", "*.snippet.tex"]
///   require_documentclass: true
/// ```
#[derive(Debug, Clone)]
pub struct SourcePatterns {
	/// Glob patterns matched against root relative paths.
	pub include: Vec<String>,
	/// Gitignore-style patterns for files and directories to skip.
	pub exclude: Vec<String>,
	/// Only keep files containing `\documentclass`.
	pub require_documentclass: bool,
	/// Whether `.gitignore` rules at the root are applied.
	pub respect_gitignore: bool,
}

impl Default for SourcePatterns {
	fn default() -> Self {
		Self {
			include: vec![DEFAULT_INCLUDE_PATTERN.to_string()],
			exclude: Vec::new(),
			require_documentclass: true,
			respect_gitignore: true,
		}
	}
}

impl SourcePatterns {
	/// Read the `file_patterns` section through `backend`.
	pub fn from_config<B: ConfigBackend + ?Sized>(backend: &B) -> TexcfgResult<Self> {
		let defaults = Self::default();
		let mut include = backend.get_array(&ConfigPath::new("file_patterns.include"));
		if include.is_empty() {
			include = defaults.include;
		}

		Ok(Self {
			include,
			exclude: backend.get_array(&ConfigPath::new("file_patterns.exclude")),
			require_documentclass: flag(
				backend,
				"file_patterns.require_documentclass",
				defaults.require_documentclass,
			)?,
			respect_gitignore: flag(
				backend,
				"file_patterns.respect_gitignore",
				defaults.respect_gitignore,
			)?,
		})
	}
}

fn flag<B: ConfigBackend + ?Sized>(backend: &B, path: &str, default: bool) -> TexcfgResult<bool> {
	let fallback = if default { "true" } else { "false" };
	let value = backend.get(&ConfigPath::new(path), Some(fallback))?;
	Ok(!matches!(
		value.trim().to_ascii_lowercase().as_str(),
		"false" | "no" | "off" | "0"
	))
}

/// Collect the documents under `root` selected by `patterns`, sorted.
pub fn discover_sources(root: &Path, patterns: &SourcePatterns) -> TexcfgResult<Vec<PathBuf>> {
	let include_set = build_glob_set(&patterns.include)?;
	let exclude = build_exclude_matcher(root, &patterns.exclude)?;
	let gitignore = if patterns.respect_gitignore {
		build_gitignore(root)
	} else {
		Gitignore::empty()
	};

	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();
	walk_dir(
		root,
		root,
		&include_set,
		&[&gitignore, &exclude],
		&mut visited_dirs,
		&mut files,
	)?;

	if patterns.require_documentclass {
		files.retain(|path| is_root_document(path));
	}

	files.sort();
	tracing::debug!(root = %root.display(), count = files.len(), "discovered documents");
	Ok(files)
}

/// Whether the file at `path` declares a document class.
pub fn is_root_document(path: &Path) -> bool {
	std::fs::read(path)
		.is_ok_and(|bytes| String::from_utf8_lossy(&bytes).contains(DOCUMENT_CLASS_MARKER))
}

fn build_glob_set(patterns: &[String]) -> TexcfgResult<GlobSet> {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		let glob = Glob::new(pattern).map_err(|e| {
			TexcfgError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
		builder.add(glob);
	}

	builder.build().map_err(|e| {
		TexcfgError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> TexcfgResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			TexcfgError::InvalidPattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}

	builder.build().map_err(|e| {
		TexcfgError::InvalidPattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

/// Build a matcher from the root `.gitignore` (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.is_file() {
		if let Some(e) = builder.add(gitignore_path) {
			tracing::warn!(error = %e, "ignoring malformed .gitignore");
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

fn walk_dir(
	root: &Path,
	dir: &Path,
	include_set: &GlobSet,
	ignores: &[&Gitignore],
	visited_dirs: &mut HashSet<PathBuf>,
	files: &mut Vec<PathBuf>,
) -> TexcfgResult<()> {
	// Guard against symlink cycles.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if path
			.file_name()
			.and_then(|n| n.to_str())
			.is_some_and(is_ignored_directory_name)
		{
			continue;
		}

		let is_dir = path.is_dir();
		if ignores
			.iter()
			.any(|matcher| matcher.matched(&path, is_dir).is_ignore())
		{
			continue;
		}

		if is_dir {
			walk_dir(root, &path, include_set, ignores, visited_dirs, files)?;
		} else if path
			.strip_prefix(root)
			.is_ok_and(|relative| include_set.is_match(relative))
		{
			files.push(path);
		}
	}

	Ok(())
}
