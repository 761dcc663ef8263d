use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de;
use serde::de::DeserializeSeed;
use serde::de::EnumAccess;
use serde::de::MapAccess;
use serde::de::SeqAccess;
use serde::de::VariantAccess;
use serde::de::Visitor;

use crate::TexcfgError;
use crate::TexcfgResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 6] = [
	"texcfg.yml",
	"texcfg.yaml",
	".github/build-config.yml",
	".github/build-config.yaml",
	"build-config.yml",
	"build-config.yaml",
];

/// A single node of the configuration tree.
///
/// Scalars are kept as strings, so `year: 2025` and `year: "2025"` resolve to
/// the same value. Numbers keep the text they were written with (`1.10` stays
/// `1.10`); TOML floats, which lose it on parse, always show a fractional part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ConfigNode {
	/// An explicit `null` (or `~`) in the source.
	Null,
	Scalar(String),
	Sequence(Vec<ConfigNode>),
	Mapping(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
	/// Returns the scalar string if this node is a scalar.
	pub fn as_scalar(&self) -> Option<&str> {
		match self {
			Self::Scalar(value) => Some(value.as_str()),
			_ => None,
		}
	}

	/// Returns the child mapping if this node is a mapping.
	pub fn as_mapping(&self) -> Option<&BTreeMap<String, ConfigNode>> {
		match self {
			Self::Mapping(map) => Some(map),
			_ => None,
		}
	}

	/// Returns the elements if this node is a sequence.
	pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
		match self {
			Self::Sequence(items) => Some(items.as_slice()),
			_ => None,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Render the node as text suitable for printing on a single command
	/// line. Scalars are returned verbatim, everything else as YAML.
	pub fn to_display_string(&self) -> String {
		match self {
			Self::Scalar(value) => value.clone(),
			Self::Null => String::new(),
			other => {
				serde_yaml_ng::to_string(other)
					.map(|yaml| yaml.trim_end().to_string())
					.unwrap_or_default()
			}
		}
	}

	/// Render the node as a single line. Used for sequence elements which are
	/// themselves collections.
	pub fn to_inline_string(&self) -> String {
		match self {
			Self::Scalar(value) => value.clone(),
			Self::Null => String::new(),
			other => serde_json::to_string(other).unwrap_or_default(),
		}
	}

	/// Mapping keys are always strings. `null` keys keep their YAML spelling.
	fn into_key(self) -> String {
		match self {
			Self::Scalar(value) => value,
			Self::Null => "null".to_string(),
			other => other.to_inline_string(),
		}
	}

	/// Convert a `serde_json::Value` into a node. Also used for the output of
	/// external backends which speak JSON.
	pub fn from_json(value: serde_json::Value) -> Self {
		use serde_json::Value;

		match value {
			Value::Null => Self::Null,
			Value::Bool(b) => Self::Scalar(b.to_string()),
			Value::Number(n) => Self::Scalar(n.to_string()),
			Value::String(s) => Self::Scalar(s),
			Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from_json).collect()),
			Value::Object(object) => {
				Self::Mapping(
					object
						.into_iter()
						.map(|(key, value)| (key, Self::from_json(value)))
						.collect(),
				)
			}
		}
	}

	fn from_toml(value: toml::Value) -> Self {
		match value {
			toml::Value::String(s) => Self::Scalar(s),
			toml::Value::Integer(i) => Self::Scalar(i.to_string()),
			toml::Value::Float(f) => Self::Scalar(format!("{f:?}")),
			toml::Value::Boolean(b) => Self::Scalar(b.to_string()),
			toml::Value::Datetime(dt) => Self::Scalar(dt.to_string()),
			toml::Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from_toml).collect()),
			toml::Value::Table(table) => {
				Self::Mapping(
					table
						.into_iter()
						.map(|(key, value)| (key, Self::from_toml(value)))
						.collect(),
				)
			}
		}
	}
}

/// The parsed configuration. The root is always a mapping; an empty source
/// produces an empty tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
	root: BTreeMap<String, ConfigNode>,
}

impl ConfigTree {
	pub fn new(root: BTreeMap<String, ConfigNode>) -> Self {
		Self { root }
	}

	/// Parse configuration text in the given format.
	pub fn parse(content: &str, format: ConfigFormat, path_display: &str) -> TexcfgResult<Self> {
		let node = match format {
			ConfigFormat::Yaml => {
				read_yaml(content).map_err(|e| {
					let location = e.location();
					TexcfgError::ConfigParse {
						path: path_display.to_string(),
						format: format.to_string(),
						line: location.as_ref().map(serde_yaml_ng::Location::line),
						column: location.as_ref().map(serde_yaml_ng::Location::column),
						message: e.to_string(),
					}
				})?
			}
			ConfigFormat::Json => {
				let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
					TexcfgError::ConfigParse {
						path: path_display.to_string(),
						format: format.to_string(),
						line: Some(e.line()),
						column: Some(e.column()),
						message: e.to_string(),
					}
				})?;
				ConfigNode::from_json(value)
			}
			ConfigFormat::Toml => {
				let value: toml::Table = toml::from_str(content).map_err(|e| {
					let (line, column) = e
						.span()
						.map(|span| line_and_column(content, span.start))
						.unzip();
					TexcfgError::ConfigParse {
						path: path_display.to_string(),
						format: format.to_string(),
						line,
						column,
						message: e.message().to_string(),
					}
				})?;
				ConfigNode::from_toml(toml::Value::Table(value))
			}
		};

		match node {
			ConfigNode::Mapping(root) => Ok(Self { root }),
			ConfigNode::Null => Ok(Self::default()),
			_ => {
				Err(TexcfgError::ConfigParse {
					path: path_display.to_string(),
					format: format.to_string(),
					line: None,
					column: None,
					message: "top level of the configuration must be a mapping".to_string(),
				})
			}
		}
	}

	/// The top-level mapping.
	pub fn root(&self) -> &BTreeMap<String, ConfigNode> {
		&self.root
	}

	/// Walk `path` through nested mappings. Returns `None` the first time a
	/// segment is missing or the current node is not a mapping.
	pub fn lookup(&self, path: &ConfigPath) -> Option<&ConfigNode> {
		let mut segments = path.segments();
		let Some(first) = segments.next() else {
			return None;
		};

		let mut current = self.root.get(first)?;
		for segment in segments {
			current = current.as_mapping()?.get(segment)?;
		}

		Some(current)
	}

	pub fn contains_section(&self, name: &str) -> bool {
		self.root.contains_key(name)
	}
}

/// A dot separated location in the configuration tree, e.g. `texlive.year`.
///
/// Empty segments are ignored so the `yq` style `.texlive.year` addresses the
/// same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
	raw: String,
}

impl ConfigPath {
	pub fn new(raw: impl Into<String>) -> Self {
		Self { raw: raw.into() }
	}

	/// The non-empty segments of the path.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.raw.split('.').filter(|segment| !segment.is_empty())
	}

	pub fn is_root(&self) -> bool {
		self.segments().next().is_none()
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}
}

impl fmt::Display for ConfigPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.raw)
	}
}

impl From<&str> for ConfigPath {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for ConfigPath {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

/// Serialization format of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Yaml,
	Json,
	Toml,
}

impl ConfigFormat {
	/// Pick the format from the file extension. Files without a known
	/// extension are treated as YAML.
	pub fn from_path(path: &Path) -> Self {
		let extension = path
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("")
			.to_ascii_lowercase();

		match extension.as_str() {
			"json" => Self::Json,
			"toml" => Self::Toml,
			_ => Self::Yaml,
		}
	}

	/// Parse an explicit format name.
	pub fn from_name(name: &str) -> TexcfgResult<Self> {
		match name.trim().to_ascii_lowercase().as_str() {
			"yaml" | "yml" => Ok(Self::Yaml),
			"json" => Ok(Self::Json),
			"toml" => Ok(Self::Toml),
			other => Err(TexcfgError::UnsupportedFormat(other.to_string())),
		}
	}
}

impl fmt::Display for ConfigFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Yaml => "yaml",
			Self::Json => "json",
			Self::Toml => "toml",
		};
		f.write_str(name)
	}
}

/// Owns the configuration tree for one process.
///
/// The file location is passed in explicitly so several stores can coexist.
/// The file is read and parsed on the first call to [`ConfigStore::tree`];
/// later calls return the same tree.
#[derive(Debug)]
pub struct ConfigStore {
	path: PathBuf,
	format: ConfigFormat,
	tree: OnceLock<ConfigTree>,
}

impl ConfigStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let format = ConfigFormat::from_path(&path);
		Self {
			path,
			format,
			tree: OnceLock::new(),
		}
	}

	/// Build a store around an already parsed tree.
	pub fn from_tree(path: impl Into<PathBuf>, tree: ConfigTree) -> Self {
		let store = Self::new(path);
		let _ = store.tree.set(tree);
		store
	}

	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Create a store for the first discovered config file under `root`.
	pub fn discover(root: &Path) -> TexcfgResult<Self> {
		Self::resolve_path(root).map(Self::new).ok_or_else(|| {
			TexcfgError::ConfigNotFound {
				path: root.join(CONFIG_FILE_CANDIDATES[0]).display().to_string(),
			}
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn format(&self) -> ConfigFormat {
		self.format
	}

	/// Load the tree, reading the file only the first time.
	pub fn tree(&self) -> TexcfgResult<&ConfigTree> {
		if let Some(tree) = self.tree.get() {
			return Ok(tree);
		}

		let tree = load(&self.path, self.format)?;
		Ok(self.tree.get_or_init(|| tree))
	}
}

/// Read and parse the config file at `path`.
pub fn load(path: &Path, format: ConfigFormat) -> TexcfgResult<ConfigTree> {
	let path_display = path.display().to_string();
	let content = match std::fs::read_to_string(path) {
		Ok(content) => content,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			return Err(TexcfgError::ConfigNotFound { path: path_display });
		}
		Err(e) => return Err(e.into()),
	};

	tracing::debug!(path = %path_display, %format, "loading configuration");
	ConfigTree::parse(&content, format, &path_display)
}

/// Convert a byte offset into a 1-indexed line and column.
fn line_and_column(content: &str, offset: usize) -> (usize, usize) {
	let before = content.get(..offset).unwrap_or(content);
	let line = before.matches('\n').count() + 1;
	let column = before
		.rfind('\n')
		.map_or(before.chars().count(), |newline| {
			before[newline + 1..].chars().count()
		}) + 1;
	(line, column)
}

/// Parse YAML into a node, keeping numeric scalars exactly as written.
///
/// The YAML parser resolves plain scalars such as `1.10` or `0o17` to numbers,
/// which loses their spelling. The first pass records where numbers occur; the
/// second pass reads those positions back as raw text.
fn read_yaml(content: &str) -> Result<ConfigNode, serde_yaml_ng::Error> {
	let shape = YamlShape::deserialize(serde_yaml_ng::Deserializer::from_str(content))?;
	NodeSeed(&shape).deserialize(serde_yaml_ng::Deserializer::from_str(content))
}

/// Layout of a YAML document without scalar values.
#[derive(Debug)]
enum YamlShape {
	Number,
	Other,
	Sequence(Vec<YamlShape>),
	Mapping(Vec<(YamlShape, YamlShape)>),
}

static OTHER_SHAPE: YamlShape = YamlShape::Other;

impl<'de> Deserialize<'de> for YamlShape {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(ShapeVisitor)
	}
}

struct ShapeVisitor;

impl<'de> Visitor<'de> for ShapeVisitor {
	type Value = YamlShape;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("any YAML value")
	}

	fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
		Ok(YamlShape::Other)
	}

	fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
		Ok(YamlShape::Number)
	}

	fn visit_i128<E: de::Error>(self, _: i128) -> Result<Self::Value, E> {
		Ok(YamlShape::Number)
	}

	fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
		Ok(YamlShape::Number)
	}

	fn visit_u128<E: de::Error>(self, _: u128) -> Result<Self::Value, E> {
		Ok(YamlShape::Number)
	}

	fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
		Ok(YamlShape::Number)
	}

	fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
		Ok(YamlShape::Other)
	}

	fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(YamlShape::Other)
	}

	fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(YamlShape::Other)
	}

	fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		YamlShape::deserialize(deserializer)
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
		let mut items = Vec::new();
		while let Some(item) = seq.next_element()? {
			items.push(item);
		}
		Ok(YamlShape::Sequence(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
		let mut entries = Vec::new();
		while let Some(entry) = map.next_entry()? {
			entries.push(entry);
		}
		Ok(YamlShape::Mapping(entries))
	}

	// Custom tags (`!env value`) arrive as enums; the tag is dropped.
	fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Self::Value, A::Error> {
		let (_tag, variant): (String, _) = data.variant()?;
		variant.newtype_variant()
	}
}

/// Builds a [`ConfigNode`] guided by the shape from the first pass.
struct NodeSeed<'s>(&'s YamlShape);

impl<'de> DeserializeSeed<'de> for NodeSeed<'_> {
	type Value = ConfigNode;

	fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		match self.0 {
			YamlShape::Number => deserializer.deserialize_str(NodeVisitor(self.0)),
			_ => deserializer.deserialize_any(NodeVisitor(self.0)),
		}
	}
}

struct NodeVisitor<'s>(&'s YamlShape);

impl<'de> Visitor<'de> for NodeVisitor<'_> {
	type Value = ConfigNode;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("any YAML value")
	}

	fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_i128<E: de::Error>(self, value: i128) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_u128<E: de::Error>(self, value: u128) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(format!("{value:?}")))
	}

	fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value.to_string()))
	}

	fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
		Ok(ConfigNode::Scalar(value))
	}

	fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(ConfigNode::Null)
	}

	fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(ConfigNode::Null)
	}

	fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
		NodeSeed(self.0).deserialize(deserializer)
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
		let shapes = match self.0 {
			YamlShape::Sequence(shapes) => shapes.as_slice(),
			_ => &[],
		};

		let mut items = Vec::with_capacity(shapes.len());
		while let Some(item) =
			seq.next_element_seed(NodeSeed(shapes.get(items.len()).unwrap_or(&OTHER_SHAPE)))?
		{
			items.push(item);
		}
		Ok(ConfigNode::Sequence(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
		let shapes = match self.0 {
			YamlShape::Mapping(shapes) => shapes.as_slice(),
			_ => &[],
		};

		let mut entries = BTreeMap::new();
		for index in 0.. {
			let (key_shape, value_shape) = shapes
				.get(index)
				.map_or((&OTHER_SHAPE, &OTHER_SHAPE), |(key, value)| (key, value));
			let Some(key) = map.next_key_seed(NodeSeed(key_shape))? else {
				break;
			};
			let value = map.next_value_seed(NodeSeed(value_shape))?;
			entries.insert(key.into_key(), value);
		}
		Ok(ConfigNode::Mapping(entries))
	}

	fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Self::Value, A::Error> {
		let (_tag, variant): (String, _) = data.variant()?;
		variant.newtype_variant_seed(NodeSeed(self.0))
	}
}
