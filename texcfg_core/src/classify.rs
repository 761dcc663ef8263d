use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// The LaTeX engines a document can be compiled with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
	#[default]
	Pdflatex,
	/// Engine with system font and unicode support.
	Xelatex,
	/// Engine with embedded Lua scripting.
	Lualatex,
}

impl Compiler {
	pub const ALL: [Compiler; 3] = [Self::Pdflatex, Self::Xelatex, Self::Lualatex];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pdflatex => "pdflatex",
			Self::Xelatex => "xelatex",
			Self::Lualatex => "lualatex",
		}
	}

	/// Look up a compiler by name, ignoring case.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|compiler| compiler.as_str().eq_ignore_ascii_case(name.trim()))
	}
}

impl fmt::Display for Compiler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Compiler {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_name(s).ok_or_else(|| format!("unknown compiler `{s}`"))
	}
}

/// A piece of evidence found while classifying a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
	/// `% !TEX program = <compiler>` magic comment.
	Directive(Compiler),
	/// Font selection or multilingual packages.
	FontMarker,
	/// Inline Lua or Lua extension packages.
	ScriptMarker,
	/// Bibliography declaration or a citation command.
	Bibliography,
	/// Label or reference command.
	CrossReference,
	/// Table of contents, list of figures or list of tables.
	ContentsList,
	/// A `.bib` file next to the source file.
	SiblingBibliography,
}

impl fmt::Display for Signal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Directive(compiler) => write!(f, "directive ({compiler})"),
			Self::FontMarker => f.write_str("font marker"),
			Self::ScriptMarker => f.write_str("script marker"),
			Self::Bibliography => f.write_str("bibliography"),
			Self::CrossReference => f.write_str("cross reference"),
			Self::ContentsList => f.write_str("contents list"),
			Self::SiblingBibliography => f.write_str("sibling bibliography"),
		}
	}
}

/// How a rule recognises its signal in document text.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
	/// Case-sensitive substring.
	Literal(&'static str),
	/// Lazily compiled regular expression.
	Pattern(fn() -> &'static Regex),
}

impl Matcher {
	pub fn is_match(&self, text: &str) -> bool {
		match self {
			Self::Literal(needle) => text.contains(needle),
			Self::Pattern(regex) => regex().is_match(text),
		}
	}
}

/// A signal together with the matchers that detect it. Any matcher is
/// sufficient.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
	pub signal: Signal,
	pub matchers: &'static [Matcher],
}

impl Rule {
	pub fn is_match(&self, text: &str) -> bool {
		self.matchers.iter().any(|matcher| matcher.is_match(text))
	}
}

/// Content rules for compiler selection in priority order, each with the
/// compiler it selects. A directive outranks all of them.
pub static COMPILER_RULES: [(Rule, Compiler); 2] = [
	(
		Rule {
			signal: Signal::FontMarker,
			matchers: &[
				Matcher::Pattern(font_package_regex),
				Matcher::Literal("\\setmainfont"),
				Matcher::Literal("\\setsansfont"),
				Matcher::Literal("\\setmonofont"),
				Matcher::Literal("\\newfontfamily"),
			],
		},
		Compiler::Xelatex,
	),
	(
		Rule {
			signal: Signal::ScriptMarker,
			matchers: &[
				Matcher::Pattern(script_package_regex),
				Matcher::Literal("\\directlua"),
				Matcher::Literal("\\luaexec"),
				Matcher::Literal("\\begin{luacode"),
			],
		},
		Compiler::Lualatex,
	),
];

/// Content rules which each require a second compilation pass.
pub static SECOND_PASS_RULES: [Rule; 3] = [
	Rule {
		signal: Signal::Bibliography,
		matchers: &[
			Matcher::Literal("\\bibliography{"),
			Matcher::Literal("\\addbibresource"),
			Matcher::Literal("\\printbibliography"),
			Matcher::Pattern(citation_regex),
		],
	},
	Rule {
		signal: Signal::CrossReference,
		matchers: &[Matcher::Pattern(cross_reference_regex)],
	},
	Rule {
		signal: Signal::ContentsList,
		matchers: &[
			Matcher::Literal("\\tableofcontents"),
			Matcher::Literal("\\listoffigures"),
			Matcher::Literal("\\listoftables"),
		],
	},
];

fn directive_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"(?im)^[ \t]*%[ \t]*!TEX[ \t]+(?:TS-)?program[ \t]*=[ \t]*([a-z]+)")
			.expect("directive regex is valid")
	})
}

fn font_package_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"\\(?:usepackage|RequirePackage)(?:\[[^\]]*\])?\{[^}]*\b(?:fontspec|polyglossia|xeCJK|unicode-math|xltxtra|mathspec)\b[^}]*\}",
		)
		.expect("font package regex is valid")
	})
}

fn script_package_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"\\(?:usepackage|RequirePackage)(?:\[[^\]]*\])?\{[^}]*\b(?:luacode|luatextra|luamplib)\b[^}]*\}",
		)
		.expect("script package regex is valid")
	})
}

fn citation_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(r"\\[A-Za-z]*[cC]ite[A-Za-z]*\*?(?:\[[^\]]*\])*\{")
			.expect("citation regex is valid")
	})
}

fn cross_reference_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| {
		Regex::new(
			r"\\(?:label|ref|pageref|eqref|[aA]utoref|[cC]ref|[cC]pageref|labelcref|[nN]ameref|namecref|[vV]ref|vpageref|subref)\*?\{",
		)
		.expect("cross reference regex is valid")
	})
}

/// The classification of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDescriptor {
	pub source_path: PathBuf,
	pub compiler: Compiler,
	pub needs_second_pass: bool,
	/// Every signal that contributed to the decision, compiler signal first.
	pub signals: Vec<Signal>,
}

impl DocumentDescriptor {
	/// The descriptor used when a file cannot be read.
	pub fn fallback(source_path: impl Into<PathBuf>) -> Self {
		Self {
			source_path: source_path.into(),
			compiler: Compiler::default(),
			needs_second_pass: false,
			signals: Vec::new(),
		}
	}

	/// Number of compiler runs the document needs.
	pub fn pass_count(&self) -> u8 {
		if self.needs_second_pass { 2 } else { 1 }
	}
}

/// Find a `% !TEX program = ...` directive naming a known compiler.
pub fn detect_directive(text: &str) -> Option<Compiler> {
	directive_regex()
		.captures_iter(text)
		.find_map(|captures| Compiler::from_name(&captures[1]))
}

/// Pick the compiler for `text` along with the signal that decided it.
pub fn detect_compiler_with_signal(text: &str) -> (Compiler, Option<Signal>) {
	if let Some(compiler) = detect_directive(text) {
		return (compiler, Some(Signal::Directive(compiler)));
	}

	COMPILER_RULES
		.iter()
		.find(|(rule, _)| rule.is_match(text))
		.map_or((Compiler::default(), None), |(rule, compiler)| {
			(*compiler, Some(rule.signal))
		})
}

/// Pick the compiler for `text`: directive first, then font markers, then
/// script markers, then the default.
pub fn detect_compiler(text: &str) -> Compiler {
	detect_compiler_with_signal(text).0
}

/// Every second-pass signal present in `text` or, when `source_dir` is given,
/// in the directory next to it.
pub fn second_pass_signals(text: &str, source_dir: Option<&Path>) -> Vec<Signal> {
	let mut signals: Vec<Signal> = SECOND_PASS_RULES
		.iter()
		.filter(|rule| rule.is_match(text))
		.map(|rule| rule.signal)
		.collect();

	if source_dir.is_some_and(has_sibling_bibliography) {
		signals.push(Signal::SiblingBibliography);
	}

	signals
}

/// Whether `text` needs a second compilation pass.
pub fn needs_second_pass(text: &str, source_dir: Option<&Path>) -> bool {
	!second_pass_signals(text, source_dir).is_empty()
}

/// Whether `dir` contains a `.bib` file.
pub fn has_sibling_bibliography(dir: &Path) -> bool {
	let Ok(entries) = std::fs::read_dir(dir) else {
		return false;
	};

	entries.filter_map(Result::ok).any(|entry| {
		let path = entry.path();
		path.is_file()
			&& path
				.extension()
				.and_then(|e| e.to_str())
				.is_some_and(|ext| ext.eq_ignore_ascii_case("bib"))
	})
}

/// Classify already loaded document text. The sibling bibliography check
/// looks in the parent directory of `source_path`.
pub fn classify_text(source_path: &Path, text: &str) -> DocumentDescriptor {
	let (compiler, compiler_signal) = detect_compiler_with_signal(text);
	let source_dir = source_path
		.parent()
		.map(|parent| if parent.as_os_str().is_empty() { Path::new(".") } else { parent });
	let pass_signals = second_pass_signals(text, source_dir);

	let mut signals = Vec::with_capacity(pass_signals.len() + 1);
	signals.extend(compiler_signal);
	signals.extend_from_slice(&pass_signals);

	let descriptor = DocumentDescriptor {
		source_path: source_path.to_path_buf(),
		compiler,
		needs_second_pass: !pass_signals.is_empty(),
		signals,
	};

	tracing::debug!(
		source = %source_path.display(),
		compiler = %descriptor.compiler,
		needs_second_pass = descriptor.needs_second_pass,
		"classified document"
	);

	descriptor
}

/// Read and classify the file at `path`.
///
/// A file that is missing or unreadable is not an error: the default
/// compiler and a single pass are reported instead.
pub fn classify_file(path: &Path) -> DocumentDescriptor {
	match std::fs::read(path) {
		Ok(bytes) => classify_text(path, &String::from_utf8_lossy(&bytes)),
		Err(e) => {
			tracing::warn!(
				source = %path.display(),
				error = %e,
				"unable to read document, using default classification"
			);
			DocumentDescriptor::fallback(path)
		}
	}
}
