use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TagplateError {
	#[error(transparent)]
	#[diagnostic(code(tagplate::io_error))]
	Io(#[from] std::io::Error),

	#[error("unterminated string in `<{tag}>` on line {line}")]
	#[diagnostic(
		code(tagplate::unterminated_string),
		help("quotes inside an attribute value must be balanced in pairs or escaped with `\\`")
	)]
	UnterminatedString { tag: String, line: usize },

	#[error("closing bracket '>' not found for tag `<{tag}>` at line {line}")]
	#[diagnostic(code(tagplate::missing_closing_bracket))]
	MissingClosingBracket { tag: String, line: usize },

	#[error("expected {expected} in `<{tag}>` on line {line}, found `{found}`")]
	#[diagnostic(code(tagplate::unexpected_token))]
	UnexpectedToken {
		tag: String,
		expected: String,
		found: String,
		line: usize,
	},

	#[error("missing closing tag for `<{tag}>` opened on line {line}")]
	#[diagnostic(
		code(tagplate::missing_closing_tag),
		help("add `</{tag}>` to close this block or end the tag with `/>`")
	)]
	MissingClosingTag { tag: String, line: usize },

	#[error("expected closing tag `</{expected}>` but found `</{found}>` on line {line}")]
	#[diagnostic(code(tagplate::mismatched_closing_tag))]
	MismatchedClosingTag {
		expected: String,
		found: String,
		line: usize,
	},

	#[error("closing tag `</{tag}>` on line {line} has no matching opening tag")]
	#[diagnostic(code(tagplate::unmatched_closing_tag))]
	UnmatchedClosingTag { tag: String, line: usize },

	#[error("no component named `{name}` for tag on line {line}")]
	#[diagnostic(
		code(tagplate::unknown_component),
		help("add a `{name}` template to the components folder")
	)]
	UnknownComponent { name: String, line: usize },

	#[error("template `{name}` not found at `{path}`")]
	#[diagnostic(code(tagplate::template_not_found))]
	TemplateNotFound { name: String, path: String },

	#[error("layout `{layout}` extended by `{template}` not found")]
	#[diagnostic(
		code(tagplate::layout_not_found),
		help("check the `{{# extends \"...\" #}}` directive in `{template}`")
	)]
	LayoutNotFound { layout: String, template: String },

	#[error("layout cycle detected: {chain}")]
	#[diagnostic(code(tagplate::layout_cycle))]
	LayoutCycle { chain: String },

	#[error("no templates specified")]
	#[diagnostic(code(tagplate::no_templates))]
	NoTemplates,

	#[error("failed to compile template `{name}`: {reason}")]
	#[diagnostic(code(tagplate::template_compile))]
	TemplateCompile { name: String, reason: String },

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(tagplate::template_render))]
	TemplateRender(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tagplate::config_parse),
		help("check that tagplate.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(tagplate::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(tagplate::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),
}

pub type TagplateResult<T> = Result<T, TagplateError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
