use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render templates that use XML-like component tags.",
	long_about = "tagplate renders minijinja templates extended with component tags such as \
	              `<Card title=\"x\">body</Card>`.\n\nComponents live in the `components` folder \
	              of the template root, shared fragments in the `shared` folder.\n\nQuick \
	              start:\n  tagplate render page --data data.json\n  tagplate files page\n  \
	              tagplate rewrite page.tmpl"
)]
pub struct TagplateCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the template root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template and print the result.
	///
	/// The template is assembled with its layouts, the files of its folder,
	/// every template it references and the shared fragments, then rendered
	/// with the given data.
	Render {
		/// Template name relative to the root, without the extension.
		name: String,

		/// Render inside this layout instead of the one the template declares.
		#[arg(long)]
		layout: Option<String>,

		/// A `.json`, `.toml`, `.yaml` or `.yml` file with the render data.
		#[arg(long)]
		data: Option<PathBuf>,
	},
	/// Print a template file with its component tags rewritten into
	/// `component(...)` calls.
	Rewrite {
		/// Path of the file to rewrite.
		file: PathBuf,
	},
	/// List the files compiled together to render a template.
	Files {
		/// Template name relative to the root, without the extension.
		name: String,
	},
}
