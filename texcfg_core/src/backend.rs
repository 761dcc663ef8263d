use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use crate::ConfigFormat;
use crate::ConfigNode;
use crate::ConfigPath;
use crate::ConfigStore;
use crate::ConfigTree;
use crate::TexcfgError;
use crate::TexcfgResult;
use crate::resolve;

/// A source of configuration values addressed by dotted paths.
///
/// Callers only ever talk to this trait. Which implementation sits behind it
/// is decided once at startup by [`select_backend`].
pub trait ConfigBackend: Send + Sync {
	/// Short identifier shown in logs and errors.
	fn name(&self) -> &'static str;

	/// Resolve `path` to the node stored there. `Ok(None)` means absent.
	fn lookup(&self, path: &ConfigPath) -> TexcfgResult<Option<ConfigNode>>;

	/// Resolve a scalar with the default-or-fail policy of [`resolve::get`].
	fn get(&self, path: &ConfigPath, default: Option<&str>) -> TexcfgResult<String> {
		let node = self.lookup(path)?;
		resolve::apply_default(path, node.as_ref(), default)
	}

	/// Resolve a sequence. Never fails: lookup errors are logged and produce
	/// an empty sequence.
	fn get_array(&self, path: &ConfigPath) -> Vec<String> {
		match self.lookup(path) {
			Ok(node) => resolve::sequence_items(node.as_ref()),
			Err(e) => {
				tracing::warn!(backend = self.name(), %path, error = %e, "array lookup failed");
				Vec::new()
			}
		}
	}

	/// Whether a top-level section is present.
	fn has_section(&self, name: &str) -> TexcfgResult<bool> {
		Ok(self.lookup(&ConfigPath::new(name))?.is_some())
	}
}

/// Which backend to use for path lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
	/// Use `yq` when it is installed, otherwise the in-process tree.
	Auto,
	/// In-process lookups on the parsed tree.
	#[default]
	Native,
	/// Shell out to the `yq` tool.
	Yq,
}

/// Looks values up in the tree owned by a [`ConfigStore`].
#[derive(Debug)]
pub struct NativeBackend<'a> {
	tree: &'a ConfigTree,
}

impl<'a> NativeBackend<'a> {
	pub fn new(tree: &'a ConfigTree) -> Self {
		Self { tree }
	}
}

impl ConfigBackend for NativeBackend<'_> {
	fn name(&self) -> &'static str {
		"native"
	}

	fn lookup(&self, path: &ConfigPath) -> TexcfgResult<Option<ConfigNode>> {
		Ok(self.tree.lookup(path).cloned())
	}

	fn has_section(&self, name: &str) -> TexcfgResult<bool> {
		Ok(self.tree.contains_section(name))
	}
}

/// Evaluates lookups with the external `yq` binary.
#[derive(Debug, Clone)]
pub struct YqBackend {
	program: PathBuf,
	file: PathBuf,
	format: ConfigFormat,
}

impl YqBackend {
	pub const PROGRAM: &'static str = "yq";

	pub fn new(file: impl Into<PathBuf>) -> Self {
		let file = file.into();
		let format = ConfigFormat::from_path(&file);
		Self::with_program(Self::PROGRAM, file, format)
	}

	pub fn with_program(
		program: impl Into<PathBuf>,
		file: impl Into<PathBuf>,
		format: ConfigFormat,
	) -> Self {
		Self {
			program: program.into(),
			file: file.into(),
			format,
		}
	}

	/// Check whether `program` is a `yq` this backend can drive.
	///
	/// Only mikefarah `yq` v4 and later understand `-p`, `-o=json` and
	/// `eval`. Other tools installed under the same name (the Python jq
	/// wrapper, or `yq` v3) are reported as incompatible.
	pub fn detect(program: &Path) -> YqStatus {
		let Ok(output) = Command::new(program).arg("--version").output() else {
			return YqStatus::Missing;
		};

		let stdout = String::from_utf8_lossy(&output.stdout);
		let stderr = String::from_utf8_lossy(&output.stderr);
		let version = stdout
			.lines()
			.chain(stderr.lines())
			.map(str::trim)
			.find(|line| !line.is_empty())
			.unwrap_or_default()
			.to_string();

		if output.status.success() && is_supported_version(&version) {
			YqStatus::Ready(version)
		} else {
			YqStatus::Incompatible(version)
		}
	}

	/// Translate a dotted path into a `yq` expression. Segments that are not
	/// plain identifiers are quoted.
	pub fn expression(path: &ConfigPath) -> String {
		if path.is_root() {
			return ".".to_string();
		}

		let mut expression = String::new();
		for segment in path.segments() {
			let plain = segment
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_')
				&& !segment.starts_with(|c: char| c.is_ascii_digit());
			if plain {
				expression.push('.');
				expression.push_str(segment);
			} else {
				let quoted = segment.replace('\\', "\\\\").replace('"', "\\\"");
				expression.push_str(&format!(".[\"{quoted}\"]"));
			}
		}
		expression
	}
}

/// Outcome of [`YqBackend::detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YqStatus {
	/// The program could not be started.
	Missing,
	/// The program runs but is not a supported `yq`. Holds its version line.
	Incompatible(String),
	/// A supported `yq`. Holds its version line.
	Ready(String),
}

fn version_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"\bversion v?(\d+)\.").expect("version regex is valid"))
}

/// mikefarah `yq` reports `yq (https://github.com/mikefarah/yq/) version v4.44.1`.
fn is_supported_version(line: &str) -> bool {
	version_regex()
		.captures(line)
		.and_then(|captures| captures[1].parse::<u32>().ok())
		.is_some_and(|major| major >= 4)
}

impl ConfigBackend for YqBackend {
	fn name(&self) -> &'static str {
		"yq"
	}

	fn lookup(&self, path: &ConfigPath) -> TexcfgResult<Option<ConfigNode>> {
		if path.is_root() {
			return Ok(None);
		}

		let expression = Self::expression(path);
		tracing::debug!(%expression, file = %self.file.display(), "evaluating with yq");

		let output = Command::new(&self.program)
			.arg(format!("-p={}", self.format))
			.arg("-o=json")
			.arg("eval")
			.arg(&expression)
			.arg(&self.file)
			.output()
			.map_err(|e| {
				TexcfgError::BackendCommand {
					backend: self.name().to_string(),
					reason: e.to_string(),
				}
			})?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			let reason = if stderr.is_empty() {
				format!(
					"command exited with status {}",
					output
						.status
						.code()
						.map_or_else(|| "unknown".to_string(), |code| code.to_string())
				)
			} else {
				stderr
			};

			return Err(TexcfgError::BackendCommand {
				backend: self.name().to_string(),
				reason,
			});
		}

		let stdout = String::from_utf8_lossy(&output.stdout);
		let value: serde_json::Value = serde_json::from_str(stdout.trim()).map_err(|e| {
			TexcfgError::BackendCommand {
				backend: self.name().to_string(),
				reason: format!("unexpected output: {e}"),
			}
		})?;

		let node = ConfigNode::from_json(value);
		Ok((!node.is_null()).then_some(node))
	}
}

/// Pick the backend for `store`.
///
/// The native backend needs the parsed tree, so a missing or malformed config
/// surfaces here regardless of the kind requested.
pub fn select_backend<'a>(
	store: &'a ConfigStore,
	kind: BackendKind,
) -> TexcfgResult<Box<dyn ConfigBackend + 'a>> {
	select_backend_with_program(store, kind, Path::new(YqBackend::PROGRAM))
}

/// Like [`select_backend`] but checks `program` instead of `yq` on the
/// `PATH`.
pub fn select_backend_with_program<'a>(
	store: &'a ConfigStore,
	kind: BackendKind,
	program: &Path,
) -> TexcfgResult<Box<dyn ConfigBackend + 'a>> {
	let tree = store.tree()?;

	let backend: Box<dyn ConfigBackend + 'a> = match kind {
		BackendKind::Native => Box::new(NativeBackend::new(tree)),
		BackendKind::Yq => {
			match YqBackend::detect(program) {
				YqStatus::Ready(_) => {
					Box::new(YqBackend::with_program(program, store.path(), store.format()))
				}
				YqStatus::Missing => {
					return Err(TexcfgError::BackendUnavailable(
						program.display().to_string(),
					));
				}
				YqStatus::Incompatible(version) => {
					return Err(TexcfgError::BackendUnavailable(format!(
						"{} ({version})",
						program.display()
					)));
				}
			}
		}
		BackendKind::Auto => {
			match YqBackend::detect(program) {
				YqStatus::Ready(_) => {
					Box::new(YqBackend::with_program(program, store.path(), store.format()))
				}
				YqStatus::Missing => {
					tracing::debug!(
						program = %program.display(),
						"yq not installed, using native lookups"
					);
					Box::new(NativeBackend::new(tree))
				}
				YqStatus::Incompatible(version) => {
					tracing::warn!(
						program = %program.display(),
						%version,
						"unsupported yq, falling back to native lookups"
					);
					Box::new(NativeBackend::new(tree))
				}
			}
		}
	};

	tracing::debug!(backend = backend.name(), "selected config backend");
	Ok(backend)
}
