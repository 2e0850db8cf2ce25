use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::Parser;
use owo_colors::OwoColorize;
use tagplate_cli::Commands;
use tagplate_cli::TagplateCli;
use tagplate_core::Engine;
use tagplate_core::SourceKind;
use tagplate_core::TagplateError;
use tagplate_core::load_data_file;
use tracing_subscriber::EnvFilter;

static USE_COLOR: AtomicBool = AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,dimmed) => {
		if color_enabled() {
			format!("{}", $text.dimmed())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TagplateCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_logging(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Render { name, layout, data }) => {
			run_render(&args, name, layout.as_deref(), data.as_deref())
		}
		Some(Commands::Rewrite { file }) => run_rewrite(&args, file),
		Some(Commands::Files { name }) => run_files(&args, name),
		None => {
			eprintln!("No subcommand specified. Run `tagplate --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<TagplateError>() {
			Ok(error) => {
				let report: miette::Report = (*error).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// `RUST_LOG` wins, otherwise `--verbose` turns on the library's debug logs.
fn init_logging(verbose: bool, use_color: bool) {
	let default = if verbose { "tagplate_core=debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(use_color)
		.with_writer(std::io::stderr)
		.init();
}

fn resolve_root(args: &TagplateCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_render(
	args: &TagplateCli,
	name: &str,
	layout: Option<&str>,
	data: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
	let engine = Engine::from_config(resolve_root(args))?;
	let data = match data {
		Some(path) => load_data_file(path)?,
		None => serde_json::Value::Object(serde_json::Map::new()),
	};

	let output = match layout {
		Some(layout) => engine.render_with_layout(layout, name, &data)?,
		None => engine.render(name, &data)?,
	};

	print!("{output}");

	Ok(())
}

fn run_rewrite(args: &TagplateCli, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let engine = Engine::from_config(resolve_root(args))?;
	let source = std::fs::read_to_string(file).map_err(|e| {
		format!("could not read `{}`: {e}", file.display())
	})?;

	print!("{}", engine.rewrite_source(&source)?);

	Ok(())
}

fn run_files(args: &TagplateCli, name: &str) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let engine = Engine::from_config(&root)?;
	let document = engine.document(name)?;

	println!("{} {}", colored!("Entry:", bold), document.entry);

	for file in &document.files {
		let path = file
			.path
			.as_deref()
			.map_or_else(String::new, |path| make_relative(path, &root));
		let kind = format!("[{}]", kind_label(file.kind));
		println!("  {:<28} {} {path}", file.name, colored!(kind, dimmed));
	}

	println!("\n{} file(s)", document.len());

	Ok(())
}

fn kind_label(kind: SourceKind) -> &'static str {
	match kind {
		SourceKind::Layout => "layout",
		SourceKind::Entry => "entry",
		SourceKind::Partial => "partial",
		SourceKind::Extra => "extra",
		SourceKind::Referenced => "referenced",
		SourceKind::Shared => "shared",
	}
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
		.replace('\\', "/")
}
