use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use minijinja::AutoEscape;
use minijinja::Environment;
use serde::Serialize;

use crate::TagplateError;
use crate::TagplateResult;
use crate::cache::CacheKey;
use crate::cache::CacheStats;
use crate::cache::CompiledTemplate;
use crate::cache::TemplateCache;
use crate::components::ComponentRegistry;
use crate::config::EngineOptions;
use crate::config::TagplateConfig;
use crate::document::Assembler;
use crate::document::Document;
use crate::rewriter::Rewriter;

/// A hook run against every newly created [`Environment`], used to register
/// custom filters, tests and functions.
pub type SetupFn = dyn Fn(&mut Environment<'static>) + Send + Sync;

/// Renders the templates under a root directory.
///
/// Compiled units are cached per `(layout, name)` for the lifetime of the
/// engine unless debug mode is on, in which case every render reassembles,
/// rewrites and recompiles from disk.
pub struct Engine {
	root: PathBuf,
	options: EngineOptions,
	components: ComponentRegistry,
	cache: TemplateCache,
	debug: AtomicBool,
	setup: Vec<Arc<SetupFn>>,
}

impl fmt::Debug for Engine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("root", &self.root)
			.field("options", &self.options)
			.field("components", &self.components)
			.field("cache", &self.cache)
			.field("debug", &self.is_debug())
			.field("setup", &self.setup.len())
			.finish()
	}
}

impl Engine {
	pub fn new(root: impl Into<PathBuf>, options: EngineOptions) -> TagplateResult<Self> {
		let root = root.into();
		let components = ComponentRegistry::load(&root, &options)?;
		let debug = AtomicBool::new(options.debug);

		tracing::debug!(
			root = %root.display(),
			components = components.len(),
			debug = options.debug,
			"created engine"
		);

		Ok(Self {
			root,
			options,
			components,
			cache: TemplateCache::new(),
			debug,
			setup: vec![],
		})
	}

	/// Create an engine configured by the `tagplate.toml` found at `root`, or
	/// with the default options when there is none.
	pub fn from_config(root: impl Into<PathBuf>) -> TagplateResult<Self> {
		let root = root.into();
		let config = TagplateConfig::load(&root)?.unwrap_or_default();
		Self::new(root, EngineOptions::from_config(&config))
	}

	/// Run `setup` against every environment this engine compiles.
	#[must_use]
	pub fn with_setup<F>(mut self, setup: F) -> Self
	where
		F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
	{
		self.setup.push(Arc::new(setup));
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	pub fn components(&self) -> &ComponentRegistry {
		&self.components
	}

	pub fn set_debug(&self, debug: bool) {
		self.debug.store(debug, Ordering::Relaxed);
	}

	pub fn is_debug(&self) -> bool {
		self.debug.load(Ordering::Relaxed)
	}

	pub fn stats(&self) -> CacheStats {
		self.cache.stats()
	}

	/// Whether a compiled unit for `name` is cached.
	pub fn exists(&self, name: &str) -> bool {
		self.cache.contains_name(name)
	}

	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	fn assembler(&self) -> Assembler<'_> {
		Assembler::new(&self.root, &self.options)
	}

	/// The files that are compiled together to render `name`.
	pub fn document(&self, name: &str) -> TagplateResult<Document> {
		self.assembler().resolve_file_set(name)
	}

	/// Rewrite the component tags of a single source, checking them against
	/// the engine's components.
	pub fn rewrite_source(&self, source: &str) -> TagplateResult<String> {
		let mut content = source.to_string();
		Rewriter::new(Some(&self.components)).rewrite(&mut content)?;
		Ok(content)
	}

	/// Render the template `name` with the layout it declares.
	pub fn render<S: Serialize>(&self, name: &str, data: S) -> TagplateResult<String> {
		self.render_request(None, name, &[], data)
	}

	/// Render the template `name` inside `layout`.
	pub fn render_with_layout<S: Serialize>(
		&self,
		layout: &str,
		name: &str,
		data: S,
	) -> TagplateResult<String> {
		self.render_request(Some(layout), name, &[], data)
	}

	/// Render the first of `names`, compiled together with the rest.
	pub fn render_files<S: Serialize>(&self, names: &[&str], data: S) -> TagplateResult<String> {
		let Some((name, extras)) = names.split_first() else {
			return Err(TagplateError::NoTemplates);
		};

		self.render_request(None, name, extras, data)
	}

	/// Render `source` directly, optionally inside `layout`. Shared fragments
	/// and components are available. The result is never cached.
	pub fn render_string<S: Serialize>(
		&self,
		layout: Option<&str>,
		source: &str,
		data: S,
	) -> TagplateResult<String> {
		let document = self.assembler().assemble_inline(layout, source)?;
		let compiled = self.compile_document(&document)?;
		self.cache.record_compile();
		compiled.render(data)
	}

	fn render_request<S: Serialize>(
		&self,
		layout: Option<&str>,
		name: &str,
		extras: &[&str],
		data: S,
	) -> TagplateResult<String> {
		if name.trim().is_empty() {
			return Err(TagplateError::NoTemplates);
		}

		let key_name = if extras.is_empty() {
			name.to_string()
		} else {
			format!("{name},{}", extras.join(","))
		};
		let key = CacheKey::new(layout, key_name);
		let compiled = self.compiled(&key, layout, name, extras)?;

		compiled.render(data)
	}

	fn compiled(
		&self,
		key: &CacheKey,
		layout: Option<&str>,
		name: &str,
		extras: &[&str],
	) -> TagplateResult<Arc<CompiledTemplate>> {
		let build = || {
			let document = self.assembler().assemble(layout, name, extras)?;
			self.compile_document(&document)
		};

		if self.is_debug() {
			tracing::debug!(%key, "debug mode, compiling without cache");
			let compiled = build()?;
			self.cache.record_compile();
			return Ok(Arc::new(compiled));
		}

		self.cache.get_or_compile(key, build)
	}

	fn compile_document(&self, document: &Document) -> TagplateResult<CompiledTemplate> {
		if self.is_debug() {
			let components = ComponentRegistry::load(&self.root, &self.options)?;
			return self.compile(document, &components);
		}

		self.compile(document, &self.components)
	}

	fn compile(
		&self,
		document: &Document,
		components: &ComponentRegistry,
	) -> TagplateResult<CompiledTemplate> {
		let mut env = Environment::new();
		env.set_keep_trailing_newline(true);

		if self.options.autoescape {
			env.set_auto_escape_callback(|_| AutoEscape::Html);
		} else {
			env.set_auto_escape_callback(|_| AutoEscape::None);
		}

		for setup in &self.setup {
			setup(&mut env);
		}

		components.register(&mut env)?;

		let mut rewriter = Rewriter::new(Some(components));

		for file in &document.files {
			let mut source = file.prepared_source();
			rewriter.rewrite(&mut source)?;

			env.add_template_owned(file.name.clone(), source)
				.map_err(|e| {
					TagplateError::TemplateCompile {
						name: file.name.clone(),
						reason: e.to_string(),
					}
				})?;
		}

		tracing::debug!(entry = %document.entry, files = document.len(), "compiled document");

		let names = document.files.iter().map(|file| file.name.clone()).collect();
		Ok(CompiledTemplate::new(env, document.entry.clone(), names))
	}
}
