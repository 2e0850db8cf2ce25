use std::path::Path;
use std::path::PathBuf;

use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;

use crate::TagplateError;
use crate::TagplateResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"tagplate.toml",
	".tagplate.toml",
	".config/tagplate.toml",
];

/// Setting this environment variable to a truthy value forces debug mode.
pub const DEBUG_ENV_VAR: &str = "TAGPLATE_DEBUG";

pub const DEFAULT_EXTENSION: &str = ".tmpl";
pub const DEFAULT_SHARED_FOLDER: &str = "shared";
pub const DEFAULT_COMPONENTS_FOLDER: &str = "components";

/// Configuration loaded from a `tagplate.toml` file.
///
/// ```toml
/// extension = ".html"
/// shared_folder = "partials"
/// components_folder = "components"
/// debug = false
/// autoescape = true
/// exclude = ["drafts/**", "**/*.bak.tmpl"]
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TagplateConfig {
	/// File extension of template files, with or without the leading dot.
	pub extension: String,
	/// Folder (relative to the root) whose templates are added to every
	/// compiled unit.
	pub shared_folder: String,
	/// Folder (relative to the root) holding component definitions.
	pub components_folder: String,
	/// Recompile on every render instead of using the cache.
	pub debug: bool,
	/// HTML auto-escaping of `{{ }}` output.
	pub autoescape: bool,
	/// Glob patterns, relative to the root, for template files that are never
	/// collected.
	pub exclude: Vec<String>,
}

impl Default for TagplateConfig {
	fn default() -> Self {
		Self {
			extension: DEFAULT_EXTENSION.into(),
			shared_folder: DEFAULT_SHARED_FOLDER.into(),
			components_folder: DEFAULT_COMPONENTS_FOLDER.into(),
			debug: false,
			autoescape: true,
			exclude: vec![],
		}
	}
}

impl TagplateConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> TagplateResult<Option<TagplateConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: TagplateConfig =
			toml::from_str(&content).map_err(|e| TagplateError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// Runtime options of an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineOptions {
	/// Always starts with a `.`.
	pub extension: String,
	pub shared_folder: String,
	pub components_folder: String,
	pub debug: bool,
	pub autoescape: bool,
	pub exclude: Vec<String>,
	pub exclude_set: GlobSet,
}

impl Default for EngineOptions {
	fn default() -> Self {
		Self::from_config(&TagplateConfig::default())
	}
}

impl EngineOptions {
	pub fn from_config(config: &TagplateConfig) -> Self {
		Self {
			extension: normalize_extension(&config.extension),
			shared_folder: trim_folder(&config.shared_folder),
			components_folder: trim_folder(&config.components_folder),
			debug: config.debug || is_truthy(std::env::var(DEBUG_ENV_VAR).ok().as_deref()),
			autoescape: config.autoescape,
			exclude: config.exclude.clone(),
			exclude_set: build_glob_set(&config.exclude),
		}
	}

	#[must_use]
	pub fn with_extension(mut self, extension: impl AsRef<str>) -> Self {
		self.extension = normalize_extension(extension.as_ref());
		self
	}

	#[must_use]
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	#[must_use]
	pub fn with_autoescape(mut self, autoescape: bool) -> Self {
		self.autoescape = autoescape;
		self
	}

	#[must_use]
	pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
		self.exclude_set = build_glob_set(&patterns);
		self.exclude = patterns;
		self
	}

	/// Whether the root-relative `path` matches an `exclude` pattern.
	pub fn is_excluded(&self, path: &Path) -> bool {
		self.exclude_set.is_match(path)
	}
}

/// Add the leading `.` when missing.
pub fn normalize_extension(extension: &str) -> String {
	let extension = extension.trim();

	if extension.is_empty() || extension.starts_with('.') {
		extension.to_string()
	} else {
		format!(".{extension}")
	}
}

fn trim_folder(folder: &str) -> String {
	folder.trim().trim_matches('/').to_string()
}

/// `1`, `true`, `yes` and `on` (any case) are truthy.
pub fn is_truthy(value: Option<&str>) -> bool {
	value.is_some_and(|value| {
		matches!(
			value.trim().to_ascii_lowercase().as_str(),
			"1" | "true" | "yes" | "on"
		)
	})
}

/// Build a `GlobSet` from a list of glob pattern strings. Invalid patterns
/// are skipped.
fn build_glob_set(patterns: &[String]) -> GlobSet {
	let mut builder = GlobSetBuilder::new();
	for pattern in patterns {
		if let Ok(glob) = Glob::new(pattern) {
			builder.add(glob);
		} else {
			tracing::warn!(pattern, "ignoring invalid exclude pattern");
		}
	}
	builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Load render data from a `.json`, `.toml`, `.yaml` or `.yml` file.
pub fn load_data_file(path: &Path) -> TagplateResult<serde_json::Value> {
	let path_display = path.display().to_string();
	let content = std::fs::read_to_string(path).map_err(|e| {
		TagplateError::DataFile {
			path: path_display.clone(),
			reason: e.to_string(),
		}
	})?;
	let format = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or("")
		.to_ascii_lowercase();

	parse_data(&content, &format, &path_display)
}

/// Parse render data in the given format into a `serde_json::Value`.
pub fn parse_data(
	content: &str,
	format: &str,
	path_display: &str,
) -> TagplateResult<serde_json::Value> {
	let data_error = |reason: String| {
		TagplateError::DataFile {
			path: path_display.to_string(),
			reason,
		}
	};

	match format {
		"json" => serde_json::from_str(content).map_err(|e| data_error(e.to_string())),
		"toml" => {
			let toml_value: toml::Value =
				toml::from_str(content).map_err(|e| data_error(e.to_string()))?;
			toml_to_json(toml_value).map_err(data_error)
		}
		"yaml" | "yml" => serde_yaml_ng::from_str(content).map_err(|e| data_error(e.to_string())),
		other => Err(TagplateError::UnsupportedDataFormat(other.to_string())),
	}
}

fn toml_to_json(value: toml::Value) -> Result<serde_json::Value, String> {
	let json = match value {
		toml::Value::String(s) => serde_json::Value::String(s),
		toml::Value::Integer(i) => serde_json::Value::from(i),
		toml::Value::Float(f) => {
			serde_json::Number::from_f64(f)
				.map(serde_json::Value::Number)
				.ok_or_else(|| format!("`{f}` cannot be represented as a JSON number"))?
		}
		toml::Value::Boolean(b) => serde_json::Value::Bool(b),
		toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
		toml::Value::Array(arr) => {
			serde_json::Value::Array(
				arr.into_iter()
					.map(toml_to_json)
					.collect::<Result<_, _>>()?,
			)
		}
		toml::Value::Table(table) => {
			let mut map = serde_json::Map::new();
			for (k, v) in table {
				map.insert(k, toml_to_json(v)?);
			}
			serde_json::Value::Object(map)
		}
	};

	Ok(json)
}
