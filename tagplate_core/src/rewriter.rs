use std::fmt::Write;

use crate::TagplateError;
use crate::TagplateResult;
use crate::blocks::Block;
use crate::blocks::find_leaf_blocks;
use crate::components::COMPONENT_FUNCTION;
use crate::components::ComponentRegistry;

/// Prefix of the variables that capture a block's body.
pub const BODY_VARIABLE_PREFIX: &str = "__tagplate_body_";

/// Rewrite every component tag in `content` into a `component(...)` call.
///
/// With a registry, tags that have no matching component are rejected.
pub fn rewrite(content: &mut String, registry: Option<&ComponentRegistry>) -> TagplateResult<()> {
	Rewriter::new(registry).rewrite(content)?;
	Ok(())
}

/// Turns component tags into calls, innermost first.
///
/// Occurrence ids come from a counter that keeps running across every buffer
/// rewritten by the same instance, so a compiled unit never reuses one.
#[derive(Debug)]
pub struct Rewriter<'r> {
	registry: Option<&'r ComponentRegistry>,
	counter: usize,
}

impl<'r> Rewriter<'r> {
	pub fn new(registry: Option<&'r ComponentRegistry>) -> Self {
		Self {
			registry,
			counter: 0,
		}
	}

	/// Rewrite `content` in place and return the number of passes it took.
	///
	/// Each pass replaces every leaf block at once by rebuilding the buffer
	/// from segments, then rescans the result. The number of passes equals the
	/// nesting depth of the deepest tag.
	pub fn rewrite(&mut self, content: &mut String) -> TagplateResult<usize> {
		let mut passes = 0;

		loop {
			let blocks = find_leaf_blocks(content)?;

			if blocks.is_empty() {
				break;
			}

			let mut output = String::with_capacity(content.len());
			let mut cursor = 0;

			for block in &blocks {
				self.check_known(block)?;
				output.push_str(&content[cursor..block.full.start]);
				output.push_str(&self.call_for(block));
				cursor = block.full.stop;
			}

			output.push_str(&content[cursor..]);
			*content = output;
			passes += 1;

			tracing::trace!(pass = passes, blocks = blocks.len(), "rewrote component blocks");
		}

		Ok(passes)
	}

	fn check_known(&self, block: &Block) -> TagplateResult<()> {
		match self.registry {
			Some(registry) if !registry.contains(&block.name) => {
				Err(TagplateError::UnknownComponent {
					name: block.name.clone(),
					line: block.line,
				})
			}
			_ => Ok(()),
		}
	}

	/// The call expression that replaces `block`.
	pub fn call_for(&mut self, block: &Block) -> String {
		self.counter += 1;
		let name = block.name.to_lowercase();
		let id = format!("{name}-{}", self.counter);
		let mut attrs = String::from("{");

		for (index, (key, value)) in block.args.iter().enumerate() {
			if index > 0 {
				attrs.push_str(", ");
			}
			let _ = write!(attrs, "{}: {}", quote(key), value_expression(value));
		}

		attrs.push('}');

		if block.self_closing {
			return format!(
				"{{{{ {COMPONENT_FUNCTION}({}, {attrs}, id={}, self_closing=true, is_end=false) }}}}",
				quote(&name),
				quote(&id),
			);
		}

		let body_variable = format!("{BODY_VARIABLE_PREFIX}{}", self.counter);

		format!(
			"{{% set {body_variable} %}}{}{{% endset %}}{{{{ {COMPONENT_FUNCTION}({}, {attrs}, id={}, \
			 self_closing=false, is_end=true, body={body_variable}) }}}}",
			block.body,
			quote(&name),
			quote(&id),
		)
	}
}

/// A value that is exactly one `{{ expr }}` is passed as the live expression.
/// Anything else becomes a string literal.
pub fn value_expression(value: &str) -> String {
	if let Some(expression) = single_expression(value) {
		return format!("({expression})");
	}

	quote(&value.replace("\\\"", "\"").replace("\\'", "'"))
}

fn single_expression(value: &str) -> Option<&str> {
	let inner = value.strip_prefix("{{")?.strip_suffix("}}")?;
	let inner = inner.strip_prefix(['-', '+']).unwrap_or(inner);
	let inner = inner.strip_suffix(['-', '+']).unwrap_or(inner).trim();

	if inner.is_empty() || inner.contains("{{") || inner.contains("}}") {
		return None;
	}

	Some(inner)
}

/// A double quoted string literal the template engine reads back verbatim.
fn quote(value: &str) -> String {
	serde_json::Value::String(value.to_string()).to_string()
}
