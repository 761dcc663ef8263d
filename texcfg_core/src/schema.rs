use crate::ConfigBackend;
use crate::ConfigPath;
use crate::TexcfgError;
use crate::TexcfgResult;

/// Top-level sections every build configuration must define, in the order
/// they are checked.
pub const REQUIRED_SECTIONS: [&str; 5] = [
	"texlive",
	"compilers",
	"compilation",
	"file_patterns",
	"caching",
];

/// Leaf values every build configuration must define, in the order they are
/// checked.
pub const REQUIRED_VALUES: [&str; 5] = [
	"texlive.year",
	"texlive.cache_version",
	"compilation.max_parallel",
	"git.user.name",
	"git.user.email",
];

/// Check that each of `sections` is a top-level key of the configuration.
///
/// Sections are checked in the order given and the first missing one is
/// reported. Value types and nested structure are not inspected.
pub fn validate_sections<B, S>(backend: &B, sections: &[S]) -> TexcfgResult<()>
where
	B: ConfigBackend + ?Sized,
	S: AsRef<str>,
{
	for section in sections {
		let section = section.as_ref();
		if !backend.has_section(section)? {
			return Err(TexcfgError::MissingSection(section.to_string()));
		}
	}

	Ok(())
}

/// Check that each path in `paths` resolves to a non-empty value.
pub fn validate_values<B, S>(backend: &B, paths: &[S]) -> TexcfgResult<()>
where
	B: ConfigBackend + ?Sized,
	S: AsRef<str>,
{
	for path in paths {
		let path = ConfigPath::new(path.as_ref());
		let value = backend.get(&path, None)?;
		if value.trim().is_empty() {
			return Err(TexcfgError::MissingRequiredValue(path.to_string()));
		}
	}

	Ok(())
}

/// Full validation used by `texcfg validate`: required sections first, then
/// required values.
pub fn validate_config<B: ConfigBackend + ?Sized>(backend: &B) -> TexcfgResult<()> {
	validate_sections(backend, &REQUIRED_SECTIONS)?;
	validate_values(backend, &REQUIRED_VALUES)?;
	tracing::debug!("configuration passed validation");
	Ok(())
}
