use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use minijinja::Environment;
use parking_lot::RwLock;
use serde::Serialize;

use crate::TagplateError;
use crate::TagplateResult;

/// Identifies a compiled unit: the explicit layout (if any) and the requested
/// template name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
	pub layout: Option<String>,
	pub name: String,
}

impl CacheKey {
	pub fn new(layout: Option<&str>, name: impl Into<String>) -> Self {
		Self {
			layout: layout.map(String::from),
			name: name.into(),
		}
	}
}

impl Display for CacheKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.layout {
			Some(layout) => write!(f, "{layout}:{}", self.name),
			None => write!(f, "{}", self.name),
		}
	}
}

/// A fully rewritten and compiled set of templates, ready to render.
#[derive(Debug)]
pub struct CompiledTemplate {
	env: Environment<'static>,
	entry: String,
	names: Vec<String>,
}

impl CompiledTemplate {
	pub fn new(env: Environment<'static>, entry: impl Into<String>, names: Vec<String>) -> Self {
		Self {
			env,
			entry: entry.into(),
			names,
		}
	}

	/// Name of the template a render executes.
	pub fn entry(&self) -> &str {
		&self.entry
	}

	/// Every template compiled into this unit, components excluded.
	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn environment(&self) -> &Environment<'static> {
		&self.env
	}

	pub fn render<S: Serialize>(&self, data: S) -> TagplateResult<String> {
		let template = self
			.env
			.get_template(&self.entry)
			.map_err(|e| TagplateError::TemplateRender(e.to_string()))?;

		template
			.render(data)
			.map_err(|e| TagplateError::TemplateRender(render_error_message(&e)))
	}
}

/// Include the chain of causes, which is where component failures end up.
fn render_error_message(error: &minijinja::Error) -> String {
	let mut message = error.to_string();
	let mut source = std::error::Error::source(error);

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}

	message
}

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	/// Number of units compiled, including those built in debug mode.
	pub compiles: u64,
}

/// Compiled units shared between renders.
///
/// Lookups take a read lock. A miss compiles outside of any lock and then
/// briefly takes the write lock to insert. Concurrent misses on the same key
/// may both compile, the first insert wins and later ones reuse it.
#[derive(Debug, Default)]
pub struct TemplateCache {
	entries: RwLock<HashMap<CacheKey, Arc<CompiledTemplate>>>,
	hits: AtomicU64,
	misses: AtomicU64,
	compiles: AtomicU64,
}

impl TemplateCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look up `key`, recording a hit or a miss.
	pub fn get(&self, key: &CacheKey) -> Option<Arc<CompiledTemplate>> {
		let entries = self.entries.read();
		let found = entries.get(key).cloned();

		if found.is_some() {
			self.hits.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(%key, "template cache hit");
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
			tracing::debug!(%key, "template cache miss");
		}

		found
	}

	/// Insert `compiled` unless another thread got there first. Returns the
	/// unit stored for `key`.
	pub fn insert(&self, key: CacheKey, compiled: Arc<CompiledTemplate>) -> Arc<CompiledTemplate> {
		let mut entries = self.entries.write();
		Arc::clone(entries.entry(key).or_insert(compiled))
	}

	/// Return the cached unit for `key` or build it with `compile`.
	pub fn get_or_compile<F>(&self, key: &CacheKey, compile: F) -> TagplateResult<Arc<CompiledTemplate>>
	where
		F: FnOnce() -> TagplateResult<CompiledTemplate>,
	{
		if let Some(compiled) = self.get(key) {
			return Ok(compiled);
		}

		let compiled = Arc::new(compile()?);
		self.record_compile();

		Ok(self.insert(key.clone(), compiled))
	}

	/// Count a compilation that happened outside of [`TemplateCache::get_or_compile`].
	pub fn record_compile(&self) {
		self.compiles.fetch_add(1, Ordering::Relaxed);
	}

	/// Whether a unit is cached for `key`. Does not touch the counters.
	pub fn contains(&self, key: &CacheKey) -> bool {
		self.entries.read().contains_key(key)
	}

	/// Whether any unit, with or without an explicit layout, is cached for
	/// `name`.
	pub fn contains_name(&self, name: &str) -> bool {
		self.entries.read().keys().any(|key| key.name == name)
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			compiles: self.compiles.load(Ordering::Relaxed),
		}
	}
}
