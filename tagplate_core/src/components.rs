use std::collections::BTreeMap;
use std::path::Path;

use minijinja::Environment;
use minijinja::Error;
use minijinja::ErrorKind;
use minijinja::State;
use minijinja::Value;
use minijinja::value::Kwargs;

use crate::TagplateError;
use crate::TagplateResult;
use crate::config::EngineOptions;
use crate::document::collect_template_files;
use crate::rewriter::Rewriter;

/// Name of the template function every rewritten tag calls.
pub const COMPONENT_FUNCTION: &str = "component";

/// Component definitions keyed by lowercased name, with their sources already
/// rewritten.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
	/// Prefix of the template names components are registered under.
	folder: String,
	sources: BTreeMap<String, String>,
}

impl ComponentRegistry {
	pub fn new(folder: impl Into<String>) -> Self {
		Self {
			folder: folder.into(),
			sources: BTreeMap::new(),
		}
	}

	/// Load every template of the components folder under `root`. A missing
	/// folder produces an empty registry.
	pub fn load(root: &Path, options: &EngineOptions) -> TagplateResult<Self> {
		let mut raw = Self::new(options.components_folder.clone());
		let folder = root.join(&options.components_folder);

		for path in collect_template_files(root, &folder, options, true)? {
			let Some(name) = path
				.file_name()
				.and_then(|name| name.to_str())
				.and_then(|name| name.strip_suffix(options.extension.as_str()))
			else {
				continue;
			};
			let source = std::fs::read_to_string(&path)?;
			raw.insert(name, source);
		}

		tracing::debug!(folder = %folder.display(), count = raw.len(), "loaded components");

		raw.rewritten()
	}

	/// Add a component from its unprocessed source.
	pub fn insert(&mut self, name: &str, source: impl Into<String>) {
		self.sources.insert(name.to_lowercase(), source.into());
	}

	/// Run every component source through the rewriter so components can use
	/// other components.
	pub fn rewritten(self) -> TagplateResult<Self> {
		let mut rewriter = Rewriter::new(Some(&self));
		let mut sources = BTreeMap::new();

		for (name, source) in &self.sources {
			let mut source = source.clone();
			rewriter.rewrite(&mut source)?;
			sources.insert(name.clone(), source);
		}

		Ok(Self {
			folder: self.folder.clone(),
			sources,
		})
	}

	pub fn contains(&self, name: &str) -> bool {
		self.sources.contains_key(&name.to_lowercase())
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.sources.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}

	pub fn source(&self, name: &str) -> Option<&str> {
		self.sources.get(&name.to_lowercase()).map(String::as_str)
	}

	/// The name the component is registered under in an environment.
	pub fn template_name(&self, name: &str) -> String {
		component_template_name(&self.folder, name)
	}

	/// Add every component and the `component` function to `env`.
	pub fn register(&self, env: &mut Environment<'static>) -> TagplateResult<()> {
		for (name, source) in &self.sources {
			let template_name = self.template_name(name);
			env.add_template_owned(template_name.clone(), source.clone())
				.map_err(|e| {
					TagplateError::TemplateCompile {
						name: template_name,
						reason: e.to_string(),
					}
				})?;
		}

		let folder = self.folder.clone();
		env.add_function(
			COMPONENT_FUNCTION,
			move |state: &State, name: String, attrs: Value, kwargs: Kwargs| {
				render_component(state, &folder, &name, &attrs, &kwargs)
			},
		);

		Ok(())
	}
}

fn component_template_name(folder: &str, name: &str) -> String {
	format!("{folder}/{}", name.to_lowercase())
}

/// Context keys set for every component render. They take precedence over an
/// attribute of the same name, which stays readable through `attrs`.
const RESERVED_CONTEXT_KEYS: [&str; 5] = ["attrs", "body", "id", "self_closing", "is_end"];

/// Render the component `name` with its attributes at the top level of the
/// context, alongside `attrs`, `body`, `id`, `self_closing` and `is_end`.
fn render_component(
	state: &State,
	folder: &str,
	name: &str,
	attrs: &Value,
	kwargs: &Kwargs,
) -> Result<Value, Error> {
	let template_name = component_template_name(folder, name);
	let template = state.env().get_template(&template_name).map_err(|_| {
		Error::new(
			ErrorKind::TemplateNotFound,
			format!("unknown component `{name}`"),
		)
	})?;

	let id: String = kwargs.get("id")?;
	let self_closing: bool = kwargs.get("self_closing")?;
	let is_end: bool = kwargs.get("is_end")?;
	let body: Option<Value> = kwargs.get("body")?;
	kwargs.assert_all_used()?;

	let mut context: BTreeMap<String, Value> = BTreeMap::new();

	if let Ok(keys) = attrs.try_iter() {
		for key in keys {
			let value = attrs.get_item(&key)?;
			let key = key.to_string();

			if RESERVED_CONTEXT_KEYS.contains(&key.as_str()) {
				tracing::warn!(
					component = name,
					attribute = %key,
					"attribute shadowed by component context"
				);
			}

			context.insert(key, value);
		}
	}

	context.insert("attrs".into(), attrs.clone());
	context.insert(
		"body".into(),
		Value::from_safe_string(body.map(|body| body.to_string()).unwrap_or_default()),
	);
	context.insert("id".into(), Value::from(id));
	context.insert("self_closing".into(), Value::from(self_closing));
	context.insert("is_end".into(), Value::from(is_end));

	let rendered = template.render(Value::from(context))?;
	Ok(Value::from_safe_string(rendered))
}
