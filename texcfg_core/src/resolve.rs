use crate::ConfigNode;
use crate::ConfigPath;
use crate::ConfigTree;
use crate::TexcfgError;
use crate::TexcfgResult;

/// Resolve `path` to a single value.
///
/// An absent path and a path holding an explicit `null` are treated the
/// same: `default` is returned when supplied (an empty string counts as a
/// supplied default), otherwise [`TexcfgError::MissingRequiredValue`].
/// Collections are returned in their YAML rendering.
pub fn get(tree: &ConfigTree, path: &ConfigPath, default: Option<&str>) -> TexcfgResult<String> {
	apply_default(path, tree.lookup(path), default)
}

/// Resolve `path`, failing when it is absent or `null`.
pub fn get_required(tree: &ConfigTree, path: &ConfigPath) -> TexcfgResult<String> {
	get(tree, path, None)
}

/// Resolve `path`, falling back to `default`.
pub fn get_or(tree: &ConfigTree, path: &ConfigPath, default: &str) -> String {
	match tree.lookup(path) {
		Some(node) if !node.is_null() => node.to_display_string(),
		_ => default.to_string(),
	}
}

/// Resolve `path` to an ordered list of scalars.
///
/// Never fails. Absent paths and nodes which are not sequences produce an
/// empty list.
pub fn get_array(tree: &ConfigTree, path: &ConfigPath) -> Vec<String> {
	sequence_items(tree.lookup(path))
}

pub(crate) fn apply_default(
	path: &ConfigPath,
	node: Option<&ConfigNode>,
	default: Option<&str>,
) -> TexcfgResult<String> {
	match node {
		Some(node) if !node.is_null() => {
			tracing::debug!(%path, "resolved config value");
			Ok(node.to_display_string())
		}
		_ => {
			match default {
				Some(default) => {
					tracing::debug!(%path, default, "config value absent, using default");
					Ok(default.to_string())
				}
				None => Err(TexcfgError::MissingRequiredValue(path.to_string())),
			}
		}
	}
}

pub(crate) fn sequence_items(node: Option<&ConfigNode>) -> Vec<String> {
	let Some(items) = node.and_then(ConfigNode::as_sequence) else {
		return Vec::new();
	};

	items
		.iter()
		.filter(|item| !item.is_null())
		.map(ConfigNode::to_inline_string)
		.collect()
}
