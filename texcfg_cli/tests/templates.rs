mod common;

use common::CONFIG;
use common::texcfg_cmd;
use common::write_file;
use rstest::rstest;
use texcfg_cli::Commands;
use texcfg_cli::TexcfgCli;
use texcfg_cli::parse_key_value;
use texcfg_core::AnyEmptyResult;

#[rstest]
#[case::all_known("tl-{year}-{os}", &["year=2025", "os=linux"], "tl-2025-linux")]
#[case::unknown_kept("tl-{year}-{os}", &["year=2025"], "tl-2025-{os}")]
#[case::no_rescan("{a}", &["a={b}", "b=x"], "{b}")]
#[case::repeated("{x}{x}", &["x=ab"], "abab")]
#[case::unbalanced("{year", &["year=2025"], "{year")]
fn render_substitutes_placeholders(
	#[case] template: &str,
	#[case] vars: &[&str],
	#[case] expected: &str,
) {
	let mut cmd = texcfg_cmd();
	cmd.arg("render").arg(template);
	for var in vars {
		cmd.arg("--var").arg(var);
	}

	cmd.assert()
		.success()
		.stdout(predicates::str::diff(format!("{expected}\n")));
}

#[test]
fn render_rejects_malformed_var() {
	texcfg_cmd()
		.args(["render", "{year}", "--var", "year"])
		.assert()
		.code(2)
		.stderr(predicates::str::contains("expected `name=value`"));
}

#[test]
fn parse_key_value_splits_on_first_equals() {
	assert_eq!(
		parse_key_value("timestamp=a=b"),
		Ok(("timestamp".to_string(), "a=b".to_string()))
	);
	assert!(parse_key_value("=value").is_err());
}

#[test]
fn render_vars_are_accepted_by_cli_parser() {
	use clap::Parser;

	let cli = TexcfgCli::parse_from(["texcfg", "render", "{a}", "--var", "a=1", "--var", "b=2"]);
	match cli.command {
		Some(Commands::Render { template, vars }) => {
			assert_eq!(template, "{a}");
			assert_eq!(
				vars,
				vec![
					("a".to_string(), "1".to_string()),
					("b".to_string(), "2".to_string())
				]
			);
		}
		_ => panic!("expected Render command"),
	}
}

#[test]
fn cache_key_uses_configured_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["cache-key", "--os", "linux"])
		.assert()
		.success()
		.stdout("texlive-2025-v3-linux\n");

	Ok(())
}

#[test]
fn cache_key_falls_back_to_default_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let content = CONFIG.replace("  key_template: \"texlive-{year}-{version}-{os}\"\n", "  enabled: true\n");
	let config = write_file(tmp.path(), "texcfg.yml", &content)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["cache-key", "--os", "macos"])
		.assert()
		.success()
		.stdout("texlive-2025-v3-macos\n");

	Ok(())
}

#[test]
fn commit_message_uses_default_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args([
			"commit-message",
			"--var",
			"success_count=3",
			"--var",
			"timestamp=2025-01-01T00:00:00Z",
		])
		.assert()
		.success()
		.stdout("Build 3 document(s) at 2025-01-01T00:00:00Z\n");

	Ok(())
}

#[test]
fn commit_message_keeps_missing_placeholders() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let content = format!("{CONFIG}  commit_message: \"docs: {{success_count}} PDFs [{{branch}}]\"\n");
	let config = write_file(tmp.path(), "texcfg.yml", &content)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["commit-message", "--var", "success_count=2"])
		.assert()
		.success()
		.stdout("docs: 2 PDFs [{branch}]\n");

	Ok(())
}

#[test]
fn discover_lists_root_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "texcfg.yml", CONFIG)?;
	write_file(tmp.path(), "main.tex", "\\documentclass{article}\n")?;
	write_file(tmp.path(), "paper/paper.tex", "\\documentclass{report}\n")?;
	write_file(tmp.path(), "paper/intro.tex", "\\section{Intro}\n")?;
	write_file(tmp.path(), "drafts/old.tex", "\\documentclass{article}\n")?;

	texcfg_cmd()
		.arg("--root")
		.arg(tmp.path())
		.arg("discover")
		.assert()
		.success()
		.stdout("main.tex\npaper/paper.tex\n");

	Ok(())
}

#[test]
fn discover_uses_defaults_without_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "main.tex", "\\documentclass{article}\n")?;
	write_file(tmp.path(), "drafts/old.tex", "\\documentclass{article}\n")?;

	texcfg_cmd()
		.arg("--root")
		.arg(tmp.path())
		.arg("discover")
		.assert()
		.success()
		.stdout("drafts/old.tex\nmain.tex\n");

	Ok(())
}

#[test]
fn discover_fails_for_explicit_missing_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	texcfg_cmd()
		.arg("--root")
		.arg(tmp.path())
		.arg("--config")
		.arg(tmp.path().join("absent.yml"))
		.arg("discover")
		.assert()
		.code(2);

	Ok(())
}
