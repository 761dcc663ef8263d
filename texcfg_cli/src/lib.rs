use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use texcfg_core::BackendKind;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Resolve LaTeX build configuration and classify documents for CI jobs.",
	long_about = "texcfg reads a project's build configuration and answers the questions a \
	              LaTeX build pipeline asks for every matrix job.\n\nQuick start:\n  texcfg \
	              validate              Check required sections and values\n  texcfg get \
	              texlive.year       Print a configuration value\n  texcfg compiler \
	              main.tex      Print the engine for a document\n  texcfg phase2 main.tex    \
	              Print whether a second pass is needed\n  texcfg cache-key             \
	              Print the TeX Live cache key"
)]
pub struct TexcfgCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the configuration file. When omitted the file is discovered
	/// under the project root.
	#[arg(long, short, global = true, env = "TEXCFG_CONFIG")]
	pub config: Option<PathBuf>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub root: Option<PathBuf>,

	/// Which implementation resolves configuration paths.
	#[arg(long, global = true, value_enum, default_value_t = BackendArg::Native)]
	pub backend: BackendArg,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print the value stored at a dotted configuration path.
	///
	/// Exits with a non-zero status when the value is absent (or `null`) and
	/// no default is given. Nothing is printed to stdout on failure.
	Get {
		/// Dotted path such as `texlive.year`.
		path: String,
		/// Value printed when the path is absent. May start with `-`.
		#[arg(allow_hyphen_values = true)]
		default: Option<String>,
	},
	/// Print each element of a configuration sequence on its own line.
	///
	/// Prints nothing when the path is absent or not a sequence.
	Array {
		/// Dotted path such as `texlive.packages`.
		path: String,
	},
	/// Print the compiler a LaTeX document needs: pdflatex, xelatex or
	/// lualatex.
	Compiler {
		/// The document to inspect. A missing file yields the default
		/// compiler.
		file: PathBuf,
	},
	/// Print `true` when a document needs a second compilation pass.
	Phase2 {
		/// The document to inspect. A missing file yields `false`.
		file: PathBuf,
	},
	/// Print the full classification of a document, including the signals
	/// that produced it.
	Classify {
		/// The document to inspect.
		file: PathBuf,

		/// Output format for the classification.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Check that the configuration defines every required section and
	/// value. Prints `PASSED` on success.
	Validate,
	/// Substitute `{name}` placeholders in a template.
	///
	/// Placeholders without a value are left as they are.
	Render {
		/// The template text, e.g. `texlive-{year}-{os}`.
		template: String,

		/// A `name=value` pair. May be repeated.
		#[arg(long = "var", value_parser = parse_key_value)]
		vars: Vec<(String, String)>,
	},
	/// Print the cache key for the configured TeX Live installation.
	CacheKey {
		/// Operating system placed in `{os}`. Defaults to the current host.
		#[arg(long)]
		os: Option<String>,
	},
	/// Print the configured commit message for built artifacts.
	CommitMessage {
		/// A `name=value` pair such as `success_count=3`. May be repeated.
		#[arg(long = "var", value_parser = parse_key_value)]
		vars: Vec<(String, String)>,
	},
	/// List the root documents selected by `file_patterns`, one per line.
	Discover,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
	/// Use `yq` when installed, otherwise the built-in parser.
	Auto,
	/// The built-in parser.
	Native,
	/// The external `yq` tool.
	Yq,
}

impl From<BackendArg> for BackendKind {
	fn from(value: BackendArg) -> Self {
		match value {
			BackendArg::Auto => Self::Auto,
			BackendArg::Native => Self::Native,
			BackendArg::Yq => Self::Yq,
		}
	}
}

/// Parse a `name=value` argument.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
	let Some((name, value)) = raw.split_once('=') else {
		return Err(format!("expected `name=value`, got `{raw}`"));
	};

	let name = name.trim();
	if name.is_empty() {
		return Err(format!("missing name in `{raw}`"));
	}

	Ok((name.to_string(), value.to_string()))
}
