use std::path::Path;

use tempfile::TempDir;

use crate::ArgMap;
use crate::Engine;
use crate::EngineOptions;
use crate::Tag;
use crate::TagKind;
use crate::tokens::Span;

pub fn start_tag(name: &str) -> Tag {
	Tag {
		name: name.to_string(),
		kind: TagKind::Start,
		args: ArgMap::new(),
		span: Span::default(),
		line: 1,
	}
}

pub fn end_tag(name: &str) -> Tag {
	Tag {
		kind: TagKind::End,
		..start_tag(name)
	}
}

pub fn self_closing_tag(name: &str) -> Tag {
	Tag {
		kind: TagKind::SelfClosing,
		..start_tag(name)
	}
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);

	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}

	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

/// A temporary template root holding `files` as `(relative path, content)`.
pub fn template_tree(files: &[(&str, &str)]) -> TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

	for (relative, content) in files {
		write_file(tmp.path(), relative, content);
	}

	tmp
}

pub fn engine_for(tmp: &TempDir) -> Engine {
	Engine::new(tmp.path(), EngineOptions::default().with_debug(false))
		.unwrap_or_else(|e| panic!("engine: {e}"))
}

/// Three levels of layouts: `page` extends `base` which extends `root`.
pub fn layout_chain_files() -> Vec<(&'static str, &'static str)> {
	vec![
		(
			"root.tmpl",
			"<html>{% block content %}{% endblock %}</html>",
		),
		(
			"base.tmpl",
			"{# extends \"root\" #}\n{% block content %}<main>{% block main %}{% endblock \
			 %}</main>{% endblock %}",
		),
		(
			"page.tmpl",
			"{# extends \"base\" #}\n{% block main %}Hello {{ name }}{% endblock %}",
		),
	]
}

/// A card component and a page that uses it.
pub fn card_files() -> Vec<(&'static str, &'static str)> {
	vec![
		(
			"components/Card.tmpl",
			"<div class=\"card\" id=\"{{ id }}\"><h2>{{ title }}</h2>{{ body }}</div>",
		),
		(
			"page.tmpl",
			"<Card title=\"{{ heading }}\"><p>{{ text }}</p></Card>",
		),
	]
}
