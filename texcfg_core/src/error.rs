use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TexcfgError {
	#[error(transparent)]
	#[diagnostic(code(texcfg::io_error))]
	Io(#[from] std::io::Error),

	#[error("configuration file not found: `{path}`")]
	#[diagnostic(
		code(texcfg::config_not_found),
		help("pass `--config <path>` or create `texcfg.yml` in the project root")
	)]
	ConfigNotFound { path: String },

	#[error("failed to parse {format} config `{path}`{}: {message}", location_suffix(.line, .column))]
	#[diagnostic(code(texcfg::config_parse))]
	ConfigParse {
		path: String,
		format: String,
		line: Option<usize>,
		column: Option<usize>,
		message: String,
	},

	#[error("unsupported config format: `{0}`")]
	#[diagnostic(
		code(texcfg::unsupported_format),
		help("supported formats: yaml, yml, json, toml")
	)]
	UnsupportedFormat(String),

	#[error("missing required section: `{0}`")]
	#[diagnostic(
		code(texcfg::missing_section),
		help("add a top-level `{0}:` mapping to the configuration file")
	)]
	MissingSection(String),

	#[error("missing required value: `{0}`")]
	#[diagnostic(
		code(texcfg::missing_required_value),
		help("set `{0}` in the configuration file or supply a default")
	)]
	MissingRequiredValue(String),

	#[error("config backend `{0}` is not available")]
	#[diagnostic(
		code(texcfg::backend_unavailable),
		help("install the tool or select `--backend native`")
	)]
	BackendUnavailable(String),

	#[error("config backend `{backend}` failed: {reason}")]
	#[diagnostic(code(texcfg::backend_command))]
	BackendCommand { backend: String, reason: String },

	#[error("invalid file pattern `{pattern}`: {reason}")]
	#[diagnostic(code(texcfg::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },
}

impl TexcfgError {
	/// Process exit code used by the command line for this failure kind.
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::MissingSection(_) | Self::MissingRequiredValue(_) => 1,
			Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::UnsupportedFormat(_) => 2,
			Self::BackendUnavailable(_) | Self::BackendCommand { .. } => 3,
			Self::Io(_) | Self::InvalidPattern { .. } => 4,
		}
	}
}

#[allow(clippy::ref_option)]
fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
	match (*line, *column) {
		(Some(line), Some(column)) => format!(" at line {line}, column {column}"),
		(Some(line), None) => format!(" at line {line}"),
		_ => String::new(),
	}
}

pub type TexcfgResult<T> = Result<T, TexcfgError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
