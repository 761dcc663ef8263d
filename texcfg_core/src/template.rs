use std::collections::BTreeMap;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::OnceLock;

use regex::Captures;
use regex::Regex;

use crate::ConfigBackend;
use crate::ConfigPath;
use crate::TexcfgResult;

/// Config path of the cache key template.
pub const CACHE_KEY_TEMPLATE_PATH: &str = "caching.key_template";
/// Cache key template used when the config does not define one.
pub const DEFAULT_CACHE_KEY_TEMPLATE: &str = "texlive-{year}-{version}-{os}";
/// Config path of the commit message template.
pub const COMMIT_MESSAGE_TEMPLATE_PATH: &str = "git.commit_message";
/// Commit message template used when the config does not define one.
pub const DEFAULT_COMMIT_MESSAGE_TEMPLATE: &str = "Build {success_count} document(s) at {timestamp}";

/// Anything that can supply a value for a placeholder name.
pub trait TemplateValues {
	fn value(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> TemplateValues for HashMap<String, String, S> {
	fn value(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}

impl TemplateValues for BTreeMap<String, String> {
	fn value(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}

impl TemplateValues for [(&str, &str)] {
	fn value(&self, name: &str) -> Option<&str> {
		self.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
	}
}

impl<const N: usize> TemplateValues for [(&str, &str); N] {
	fn value(&self, name: &str) -> Option<&str> {
		self.as_slice().value(name)
	}
}

fn placeholder_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_.-]+)\}").expect("placeholder regex is valid"))
}

/// Replace every `{name}` in `template` whose name has a value.
///
/// Placeholders without a value stay untouched so a template can be filled
/// in over several stages. Substituted text is never scanned again, so values
/// containing braces are inserted literally.
pub fn render<V: TemplateValues + ?Sized>(template: &str, values: &V) -> String {
	placeholder_regex()
		.replace_all(template, |captures: &Captures<'_>| {
			values
				.value(&captures[1])
				.map_or_else(|| captures[0].to_string(), str::to_string)
		})
		.into_owned()
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
	let mut names: Vec<String> = Vec::new();
	for captures in placeholder_regex().captures_iter(template) {
		let name = &captures[1];
		if !names.iter().any(|known| known == name) {
			names.push(name.to_string());
		}
	}
	names
}

/// Placeholder names in `template` that `values` cannot fill.
pub fn unresolved_placeholders<V: TemplateValues + ?Sized>(template: &str, values: &V) -> Vec<String> {
	placeholders(template)
		.into_iter()
		.filter(|name| values.value(name).is_none())
		.collect()
}

/// Render the cache key for the configured TeX Live installation.
///
/// `{year}` and `{version}` come from `texlive.year` and
/// `texlive.cache_version`; `{os}` is the runner operating system.
pub fn cache_key<B: ConfigBackend + ?Sized>(backend: &B, os: &str) -> TexcfgResult<String> {
	let template = backend.get(
		&ConfigPath::new(CACHE_KEY_TEMPLATE_PATH),
		Some(DEFAULT_CACHE_KEY_TEMPLATE),
	)?;

	let mut values = BTreeMap::new();
	values.insert("os".to_string(), os.to_string());
	for (name, path) in [("year", "texlive.year"), ("version", "texlive.cache_version")] {
		let node = backend.lookup(&ConfigPath::new(path))?;
		if let Some(node) = node.filter(|node| !node.is_null()) {
			values.insert(name.to_string(), node.to_display_string());
		}
	}

	Ok(render(&template, &values))
}

/// Render the configured commit message with caller supplied values.
pub fn commit_message<B, V>(backend: &B, values: &V) -> TexcfgResult<String>
where
	B: ConfigBackend + ?Sized,
	V: TemplateValues + ?Sized,
{
	let template = backend.get(
		&ConfigPath::new(COMMIT_MESSAGE_TEMPLATE_PATH),
		Some(DEFAULT_COMMIT_MESSAGE_TEMPLATE),
	)?;
	Ok(render(&template, values))
}
