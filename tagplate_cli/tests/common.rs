use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;
use tempfile::TempDir;

pub fn tagplate_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("tagplate"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd.env_remove("TAGPLATE_DEBUG");
	cmd
}

/// A temporary template root holding `files` as `(relative path, content)`.
pub fn template_root(files: &[(&str, &str)]) -> TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

	for (relative, content) in files {
		write(tmp.path(), relative, content);
	}

	tmp
}

fn write(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}

	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}
