use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::TagplateError;
use crate::TagplateResult;
use crate::config::EngineOptions;

/// Only the first lines of a file are searched for a layout directive.
pub const LAYOUT_SCAN_LINES: usize = 10;

/// Template name given to sources rendered from a string.
pub const INLINE_TEMPLATE_NAME: &str = "__tagplate_inline__";

/// `{# extends "base" #}` or `{# extend "base" #}`.
static COMMENT_EXTENDS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{#[-+]?\s*extends?\s*"([^"]+)"\s*[-+]?#\}"#).unwrap()
});

/// `{% extends "base" %}`
static NATIVE_EXTENDS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{%[-+]?\s*extends\s+["']([^"']+)["']\s*[-+]?%\}"#).unwrap()
});

/// Statements that load another template by name.
static REFERENCES: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"\{%[-+]?\s*(?:include|import|from|extends)\s+["']([^"']+)["']"#).unwrap()
});

/// How a template declares the layout it extends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LayoutDirective {
	/// `{# extends "base" #}`. A native `{% extends %}` is injected when the
	/// unit is compiled.
	Comment(String),
	/// `{% extends "base" %}`, left untouched.
	Native(String),
}

impl LayoutDirective {
	pub fn name(&self) -> &str {
		match self {
			Self::Comment(name) | Self::Native(name) => name,
		}
	}
}

/// Find the layout directive in the first [`LAYOUT_SCAN_LINES`] lines of
/// `source`.
pub fn find_layout_directive(source: &str) -> Option<LayoutDirective> {
	for line in source.lines().take(LAYOUT_SCAN_LINES) {
		if let Some(captures) = COMMENT_EXTENDS.captures(line) {
			return Some(LayoutDirective::Comment(captures[1].trim().to_string()));
		}

		if let Some(captures) = NATIVE_EXTENDS.captures(line) {
			return Some(LayoutDirective::Native(captures[1].trim().to_string()));
		}
	}

	None
}

/// Every template name loaded by `include`, `import`, `from` or `extends`,
/// compacted case-insensitively and in order of first appearance.
pub fn find_references(source: &str) -> Vec<String> {
	let mut seen = HashSet::new();

	REFERENCES
		.captures_iter(source)
		.map(|captures| captures[1].trim().to_string())
		.filter(|name| seen.insert(name.to_lowercase()))
		.collect()
}

/// Why a file is part of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
	Layout,
	Entry,
	/// Another file of the entry's folder.
	Partial,
	/// Explicitly requested alongside the entry.
	Extra,
	Referenced,
	Shared,
}

/// One template of a compiled unit.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSource {
	pub name: String,
	/// `None` for inline sources.
	pub path: Option<PathBuf>,
	#[serde(skip)]
	pub source: String,
	pub kind: SourceKind,
	pub directive: Option<LayoutDirective>,
	/// Layout injected as `{% extends %}` at compile time.
	pub inject_layout: Option<String>,
}

impl TemplateSource {
	pub fn inline(source: impl Into<String>) -> Self {
		let source = source.into();
		let directive = find_layout_directive(&source);

		Self {
			name: INLINE_TEMPLATE_NAME.to_string(),
			path: None,
			inject_layout: comment_layout(directive.as_ref()),
			directive,
			source,
			kind: SourceKind::Entry,
		}
	}

	/// The source handed to the template engine, before component rewriting.
	pub fn prepared_source(&self) -> String {
		match &self.inject_layout {
			Some(layout) => {
				format!(
					"{{% extends {} %}}{}",
					serde_json::Value::String(layout.clone()),
					self.source
				)
			}
			None => self.source.clone(),
		}
	}
}

fn comment_layout(directive: Option<&LayoutDirective>) -> Option<String> {
	match directive {
		Some(LayoutDirective::Comment(name)) => Some(name.clone()),
		_ => None,
	}
}

/// The ordered set of templates compiled together for one entry template:
/// layouts first, then the entry, its folder, extra files, referenced
/// templates and shared fragments.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
	pub entry: String,
	pub files: Vec<TemplateSource>,
}

impl Document {
	pub fn names(&self) -> Vec<&str> {
		self.files.iter().map(|file| file.name.as_str()).collect()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.files
			.iter()
			.any(|file| file.name.eq_ignore_ascii_case(name))
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

/// Files collected so far, never holding two with the same name.
#[derive(Default)]
struct FileSet {
	files: Vec<TemplateSource>,
	seen: HashSet<String>,
}

impl FileSet {
	fn contains(&self, name: &str) -> bool {
		self.seen.contains(&name.to_lowercase())
	}

	fn push(&mut self, file: TemplateSource) -> bool {
		if !self.seen.insert(file.name.to_lowercase()) {
			return false;
		}

		self.files.push(file);
		true
	}
}

/// Decides which templates have to be compiled together.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
	root: &'a Path,
	options: &'a EngineOptions,
}

impl<'a> Assembler<'a> {
	pub fn new(root: &'a Path, options: &'a EngineOptions) -> Self {
		Self { root, options }
	}

	/// Assemble the document for `name` using the layout it declares.
	pub fn resolve_file_set(&self, name: &str) -> TagplateResult<Document> {
		self.assemble(None, name, &[])
	}

	/// Assemble the document for `name`. An explicit `layout` replaces the
	/// one declared by a comment directive. `extras` must exist and are added
	/// after the entry's own files.
	pub fn assemble(
		&self,
		layout: Option<&str>,
		name: &str,
		extras: &[&str],
	) -> TagplateResult<Document> {
		let primary = self.primary_files(name)?;
		self.assemble_from(primary, layout, extras)
	}

	/// Assemble the document for a source that does not live on disk.
	pub fn assemble_inline(&self, layout: Option<&str>, source: &str) -> TagplateResult<Document> {
		self.assemble_from(vec![TemplateSource::inline(source)], layout, &[])
	}

	fn assemble_from(
		&self,
		mut primary: Vec<TemplateSource>,
		layout: Option<&str>,
		extras: &[&str],
	) -> TagplateResult<Document> {
		let Some(entry) = primary.first_mut() else {
			return Err(TagplateError::NoTemplates);
		};

		if let Some(layout) = layout {
			if !matches!(entry.directive, Some(LayoutDirective::Native(_))) {
				entry.inject_layout = Some(normalize_name(layout, &self.options.extension));
			}
		}

		let entry_name = entry.name.clone();
		let mut set = FileSet::default();

		for file in self.layout_chain(entry, layout)? {
			set.push(file);
		}

		for file in primary {
			set.push(file);
		}

		for extra in extras {
			let name = normalize_name(extra, &self.options.extension);
			let path = self.path_for(&name);

			if !path.is_file() {
				return Err(TagplateError::TemplateNotFound {
					name,
					path: path.display().to_string(),
				});
			}

			set.push(self.read(&name, &path, SourceKind::Extra)?);
		}

		self.discover(&mut set, 0)?;

		let shared_start = set.files.len();
		let shared_dir = self.root.join(&self.options.shared_folder);

		for path in collect_template_files(self.root, &shared_dir, self.options, true)? {
			let Some(name) = template_name(&shared_dir, &path, &self.options.extension) else {
				continue;
			};

			if !set.contains(&name) {
				set.push(self.read(&name, &path, SourceKind::Shared)?);
			}
		}

		self.discover(&mut set, shared_start)?;

		let document = Document {
			entry: entry_name,
			files: set.files,
		};

		tracing::debug!(entry = %document.entry, files = ?document.names(), "assembled document");

		Ok(document)
	}

	/// The entry file first, followed by the other files of its folder.
	fn primary_files(&self, name: &str) -> TagplateResult<Vec<TemplateSource>> {
		let name = normalize_name(name, &self.options.extension);
		let path = self.path_for(&name);

		if path.is_file() {
			let mut files = vec![self.read(&name, &path, SourceKind::Entry)?];

			if let Some((folder, _)) = name.rsplit_once('/') {
				let folder_path = self.root.join(folder);
				for sibling in collect_template_files(self.root, &folder_path, self.options, false)? {
					let Some(sibling_name) =
						template_name(self.root, &sibling, &self.options.extension)
					else {
						continue;
					};

					if !sibling_name.eq_ignore_ascii_case(&name) {
						files.push(self.read(&sibling_name, &sibling, SourceKind::Partial)?);
					}
				}
			}

			return Ok(files);
		}

		let folder_path = self.root.join(&name);

		if !name.is_empty() && folder_path.is_dir() {
			let base = name.rsplit('/').next().unwrap_or(&name);
			let index_name = format!("{name}/{base}");
			let index_path = self.path_for(&index_name);

			if !index_path.is_file() {
				return Err(TagplateError::TemplateNotFound {
					name: index_name,
					path: index_path.display().to_string(),
				});
			}

			let mut files = vec![self.read(&index_name, &index_path, SourceKind::Entry)?];

			for file in collect_template_files(self.root, &folder_path, self.options, true)? {
				let Some(file_name) = template_name(self.root, &file, &self.options.extension)
				else {
					continue;
				};

				if !file_name.eq_ignore_ascii_case(&index_name) {
					files.push(self.read(&file_name, &file, SourceKind::Partial)?);
				}
			}

			return Ok(files);
		}

		Err(TagplateError::TemplateNotFound {
			name,
			path: path.display().to_string(),
		})
	}

	/// The layouts `entry` extends, outermost first.
	fn layout_chain(
		&self,
		entry: &TemplateSource,
		explicit: Option<&str>,
	) -> TagplateResult<Vec<TemplateSource>> {
		let mut chain = vec![];
		let mut visited = vec![entry.name.clone()];
		let mut declared_by = entry.name.clone();
		let mut next = match explicit {
			Some(layout) => Some(layout.to_string()),
			None => entry.directive.as_ref().map(|d| d.name().to_string()),
		};

		while let Some(layout) = next {
			let layout = normalize_name(&layout, &self.options.extension);

			if visited.iter().any(|name| name.eq_ignore_ascii_case(&layout)) {
				visited.push(layout);
				return Err(TagplateError::LayoutCycle {
					chain: visited.join(" -> "),
				});
			}

			let path = self.path_for(&layout);

			if !path.is_file() {
				return Err(TagplateError::LayoutNotFound {
					layout,
					template: declared_by,
				});
			}

			let file = self.read(&layout, &path, SourceKind::Layout)?;
			next = file.directive.as_ref().map(|d| d.name().to_string());
			visited.push(layout.clone());
			declared_by = layout;
			chain.push(file);
		}

		chain.reverse();
		Ok(chain)
	}

	/// Add every template referenced by the files from `from` onward, and by
	/// the files that adds, as long as it exists on disk.
	fn discover(&self, set: &mut FileSet, from: usize) -> TagplateResult<()> {
		let mut index = from;

		while index < set.files.len() {
			let file = &set.files[index];
			let mut names = find_references(&file.source);

			if let Some(directive) = &file.directive {
				names.push(directive.name().to_string());
			}

			for name in names {
				let name = normalize_name(&name, &self.options.extension);

				if set.contains(&name) {
					continue;
				}

				let path = self.path_for(&name);

				if !path.is_file() || self.is_excluded(&path) {
					continue;
				}

				set.push(self.read(&name, &path, SourceKind::Referenced)?);
			}

			index += 1;
		}

		Ok(())
	}

	fn path_for(&self, name: &str) -> PathBuf {
		self.root.join(format!("{name}{}", self.options.extension))
	}

	fn is_excluded(&self, path: &Path) -> bool {
		path.strip_prefix(self.root)
			.is_ok_and(|relative| self.options.is_excluded(relative))
	}

	fn read(&self, name: &str, path: &Path, kind: SourceKind) -> TagplateResult<TemplateSource> {
		let source = std::fs::read_to_string(path)?;
		let directive = find_layout_directive(&source);

		Ok(TemplateSource {
			name: name.to_string(),
			path: Some(path.to_path_buf()),
			inject_layout: comment_layout(directive.as_ref()),
			directive,
			source,
			kind,
		})
	}
}

/// Turn a requested name into a template name: `/` separated, without
/// surrounding slashes or the template extension.
pub fn normalize_name(name: &str, extension: &str) -> String {
	let name = name.trim().replace('\\', "/");
	let name = name.trim_start_matches("./").trim_matches('/');
	let name = if extension.is_empty() {
		name
	} else {
		name.strip_suffix(extension).unwrap_or(name)
	};

	name.to_string()
}

/// The name of the template at `path` relative to `base`.
pub fn template_name(base: &Path, path: &Path, extension: &str) -> Option<String> {
	let relative = path.strip_prefix(base).ok()?;
	let relative = relative.to_str()?.replace('\\', "/");
	Some(normalize_name(&relative, extension))
}

/// Sorted template files under `dir`. Hidden entries and files matching an
/// `exclude` pattern (relative to `root`) are skipped.
pub fn collect_template_files(
	root: &Path,
	dir: &Path,
	options: &EngineOptions,
	recursive: bool,
) -> TagplateResult<Vec<PathBuf>> {
	let mut files = vec![];
	walk_dir(root, dir, options, recursive, &mut files)?;
	files.sort();
	Ok(files)
}

fn walk_dir(
	root: &Path,
	dir: &Path,
	options: &EngineOptions,
	recursive: bool,
	files: &mut Vec<PathBuf>,
) -> TagplateResult<()> {
	if !dir.is_dir() {
		return Ok(());
	}

	for entry in std::fs::read_dir(dir)? {
		let path = entry?.path();

		if path
			.file_name()
			.and_then(|name| name.to_str())
			.is_none_or(|name| name.starts_with('.'))
		{
			continue;
		}

		if path
			.strip_prefix(root)
			.is_ok_and(|relative| options.is_excluded(relative))
		{
			continue;
		}

		if path.is_dir() {
			if recursive {
				walk_dir(root, &path, options, recursive, files)?;
			}
		} else if path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.ends_with(options.extension.as_str()))
		{
			files.push(path);
		}
	}

	Ok(())
}
