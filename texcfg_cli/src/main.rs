use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use texcfg_cli::Commands;
use texcfg_cli::OutputFormat;
use texcfg_cli::TexcfgCli;
use texcfg_core::ConfigPath;
use texcfg_core::ConfigStore;
use texcfg_core::TexcfgError;
use texcfg_core::TexcfgResult;
use texcfg_core::classify::DocumentDescriptor;
use texcfg_core::classify::classify_file;
use texcfg_core::discover::SourcePatterns;
use texcfg_core::discover::discover_sources;
use texcfg_core::schema::validate_config;
use texcfg_core::select_backend;
use texcfg_core::template;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "TEXCFG_LOG";

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TexcfgCli::parse();

	// Respect NO_COLOR env var and --no-color flag, and keep piped output
	// free of escape codes.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& std::io::stdout().is_terminal()
		&& std::io::stderr().is_terminal();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose, use_color);

	// Install miette's fancy handler for the verbose error report.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Get { path, default }) => run_get(&args, path, default.as_deref()),
		Some(Commands::Array { path }) => run_array(&args, path),
		Some(Commands::Compiler { file }) => {
			run_compiler(file);
			Ok(())
		}
		Some(Commands::Phase2 { file }) => {
			run_phase2(file);
			Ok(())
		}
		Some(Commands::Classify { file, format }) => run_classify(file, *format),
		Some(Commands::Validate) => run_validate(&args),
		Some(Commands::Render { template, vars }) => {
			run_render(template, vars);
			Ok(())
		}
		Some(Commands::CacheKey { os }) => run_cache_key(&args, os.as_deref()),
		Some(Commands::CommitMessage { vars }) => run_commit_message(&args, vars),
		Some(Commands::Discover) => run_discover(&args),
		None => {
			eprintln!("No subcommand specified. Run `texcfg --help` for usage.");
			process::exit(2);
		}
	};

	if let Err(e) = result {
		let code = e.exit_code();
		if args.verbose {
			// Rich diagnostics with help text and error codes.
			let report: miette::Report = e.into();
			eprintln!("{report:?}");
		} else {
			eprintln!("{} {e}", colored!("error:", red));
		}
		process::exit(code);
	}
}

/// Send `tracing` output to stderr. `TEXCFG_LOG` takes precedence over the
/// `--verbose` default.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &TexcfgCli) -> PathBuf {
	args.root
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The store for `--config`, or for the first config file discovered under
/// the project root.
fn open_store(args: &TexcfgCli) -> TexcfgResult<ConfigStore> {
	let store = match &args.config {
		Some(path) => ConfigStore::new(path),
		None => ConfigStore::discover(&resolve_root(args))?,
	};
	tracing::debug!(path = %store.path().display(), format = %store.format(), "using configuration");
	Ok(store)
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("{label:<12} {value}");
}

fn run_get(args: &TexcfgCli, path: &str, default: Option<&str>) -> TexcfgResult<()> {
	let store = open_store(args)?;
	let backend = select_backend(&store, args.backend.into())?;
	let value = backend.get(&ConfigPath::new(path), default)?;
	println!("{value}");
	Ok(())
}

fn run_array(args: &TexcfgCli, path: &str) -> TexcfgResult<()> {
	let store = open_store(args)?;
	let backend = select_backend(&store, args.backend.into())?;
	for item in backend.get_array(&ConfigPath::new(path)) {
		println!("{item}");
	}
	Ok(())
}

fn run_compiler(file: &Path) {
	println!("{}", classify_file(file).compiler);
}

fn run_phase2(file: &Path) {
	println!("{}", classify_file(file).needs_second_pass);
}

fn run_classify(file: &Path, format: OutputFormat) -> TexcfgResult<()> {
	let descriptor = classify_file(file);

	match format {
		OutputFormat::Json => {
			let output = serde_json::to_string_pretty(&descriptor)
				.map_err(|e| TexcfgError::Io(std::io::Error::other(e)))?;
			println!("{output}");
		}
		OutputFormat::Text => print_descriptor(&descriptor),
	}

	Ok(())
}

fn print_descriptor(descriptor: &DocumentDescriptor) {
	print_field("file", descriptor.source_path.display());
	print_field("compiler", colored!(descriptor.compiler, bold));
	print_field("passes", descriptor.pass_count());

	let signals = if descriptor.signals.is_empty() {
		"none".to_string()
	} else {
		descriptor
			.signals
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>()
			.join(", ")
	};
	print_field("signals", signals);
}

fn run_validate(args: &TexcfgCli) -> TexcfgResult<()> {
	let store = open_store(args)?;
	let backend = select_backend(&store, args.backend.into())?;
	validate_config(&*backend)?;

	if args.verbose {
		eprintln!("Validated {}", store.path().display());
	}
	println!("{}", colored!("PASSED", green));
	Ok(())
}

fn run_render(template_text: &str, vars: &[(String, String)]) {
	let values: BTreeMap<String, String> = vars.iter().cloned().collect();
	println!("{}", template::render(template_text, &values));
}

fn run_cache_key(args: &TexcfgCli, os: Option<&str>) -> TexcfgResult<()> {
	let store = open_store(args)?;
	let backend = select_backend(&store, args.backend.into())?;
	let os = os.unwrap_or(std::env::consts::OS);
	println!("{}", template::cache_key(&*backend, os)?);
	Ok(())
}

fn run_commit_message(args: &TexcfgCli, vars: &[(String, String)]) -> TexcfgResult<()> {
	let store = open_store(args)?;
	let backend = select_backend(&store, args.backend.into())?;
	let values: BTreeMap<String, String> = vars.iter().cloned().collect();
	println!("{}", template::commit_message(&*backend, &values)?);
	Ok(())
}

fn run_discover(args: &TexcfgCli) -> TexcfgResult<()> {
	let root = resolve_root(args);

	// Without an explicit config the defaults apply when no file is found.
	let patterns = match open_store(args) {
		Ok(store) => {
			let backend = select_backend(&store, args.backend.into())?;
			SourcePatterns::from_config(&*backend)?
		}
		Err(TexcfgError::ConfigNotFound { .. }) if args.config.is_none() => {
			SourcePatterns::default()
		}
		Err(e) => return Err(e),
	};

	for file in discover_sources(&root, &patterns)? {
		println!("{}", make_relative(&file, &root));
	}
	Ok(())
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
