mod common;

use predicates::prelude::PredicateBooleanExt;
use tagplate_core::AnyEmptyResult;

#[test]
fn rewrite_prints_component_calls() -> AnyEmptyResult {
	let tmp = common::template_root(&[
		("components/Deck.tmpl", "deck"),
		("page.tmpl", "<Deck arg=\"arg1\" />"),
	]);

	let output = common::tagplate_cmd()
		.arg("rewrite")
		.arg(tmp.path().join("page.tmpl"))
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert!(output.status.success());
	let stdout = String::from_utf8(output.stdout)?;
	insta::assert_snapshot!(stdout, @r#"{{ component("deck", {"arg": "arg1"}, id="deck-1", self_closing=true, is_end=false) }}"#);

	Ok(())
}

#[test]
fn rewrite_reports_parse_errors() -> AnyEmptyResult {
	let tmp = common::template_root(&[
		("components/Card.tmpl", "card"),
		("page.tmpl", "<Card>\nunclosed"),
	]);

	common::tagplate_cmd()
		.arg("rewrite")
		.arg(tmp.path().join("page.tmpl"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tagplate::missing_closing_tag"));

	Ok(())
}

#[test]
fn rewrite_missing_file_fails() -> AnyEmptyResult {
	let tmp = common::template_root(&[]);

	common::tagplate_cmd()
		.arg("rewrite")
		.arg(tmp.path().join("nope.tmpl"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("could not read"));

	Ok(())
}

#[test]
fn files_lists_the_assembled_document() -> AnyEmptyResult {
	let tmp = common::template_root(&[
		("base.tmpl", "{% block main %}{% endblock %}"),
		(
			"page.tmpl",
			"{# extends \"base\" #}\n{% block main %}{% include \"partials/nav\" %}{% endblock %}",
		),
		("partials/nav.tmpl", "nav"),
		("shared/footer.tmpl", "footer"),
	]);

	common::tagplate_cmd()
		.args(["files", "page", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(
			predicates::str::contains("Entry: page")
				.and(predicates::str::contains("[layout] base.tmpl"))
				.and(predicates::str::contains("[entry] page.tmpl"))
				.and(predicates::str::contains("[referenced] partials/nav.tmpl"))
				.and(predicates::str::contains("[shared] shared/footer.tmpl"))
				.and(predicates::str::contains("4 file(s)")),
		);

	Ok(())
}

#[test]
fn files_reports_layout_cycles() -> AnyEmptyResult {
	let tmp = common::template_root(&[
		("a.tmpl", "{# extends \"b\" #}"),
		("b.tmpl", "{# extends \"a\" #}"),
	]);

	common::tagplate_cmd()
		.args(["files", "a", "--path"])
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("tagplate::layout_cycle"));

	Ok(())
}
