mod common;

use common::CONFIG;
use common::texcfg_cmd;
use common::write_file;
use rstest::rstest;
use texcfg_core::AnyEmptyResult;

#[rstest]
#[case::integer("texlive.year", "2025\n")]
#[case::string("texlive.cache_version", "v3\n")]
#[case::nested("git.user.email", "build-bot@example.com\n")]
fn get_prints_value(#[case] path: &str, #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", path])
		.assert()
		.success()
		.stdout(predicates::str::diff(expected.to_string()));

	Ok(())
}

#[test]
fn get_discovers_config_under_root() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), ".github/build-config.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--root")
		.arg(tmp.path())
		.args(["get", "compilers.default"])
		.assert()
		.success()
		.stdout("pdflatex\n");

	Ok(())
}

#[test]
fn get_uses_default_when_absent() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", "texlive.scheme", "basic"])
		.assert()
		.success()
		.stdout("basic\n");

	Ok(())
}

#[test]
fn get_accepts_empty_default() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", "texlive.scheme", ""])
		.assert()
		.success()
		.stdout("\n");

	Ok(())
}

#[test]
fn get_accepts_default_starting_with_hyphen() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", "texlive.scheme", "-1"])
		.assert()
		.success()
		.stdout("-1\n");

	Ok(())
}

#[rstest]
#[case::absent("texlive.scheme")]
#[case::null("compilation.notes")]
#[case::through_scalar("texlive.year.month")]
fn get_fails_without_default(#[case] path: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", path])
		.assert()
		.code(1)
		.stdout("")
		.stderr(predicates::str::contains(format!(
			"error: missing required value: `{path}`"
		)));

	Ok(())
}

#[test]
fn get_reports_missing_config_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	texcfg_cmd()
		.arg("--config")
		.arg(tmp.path().join("absent.yml"))
		.args(["get", "texlive.year"])
		.assert()
		.code(2)
		.stdout("")
		.stderr(predicates::str::contains("configuration file not found"));

	Ok(())
}

#[test]
fn get_reports_parse_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", "texlive: [unclosed\n")?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", "texlive.year"])
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse yaml config"));

	Ok(())
}

#[test]
fn get_reads_json_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(
		tmp.path(),
		"build.json",
		r#"{"texlive": {"year": 2024, "packages": ["latexmk"]}}"#,
	)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["get", "texlive.year"])
		.assert()
		.success()
		.stdout("2024\n");

	Ok(())
}

#[test]
fn array_prints_one_item_per_line() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["array", "texlive.packages"])
		.assert()
		.success()
		.stdout("latexmk\nbiber\n");

	Ok(())
}

#[rstest]
#[case::absent("texlive.extras")]
#[case::scalar("texlive.year")]
#[case::mapping("git.user")]
fn array_prints_nothing_for_non_sequences(#[case] path: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["array", path])
		.assert()
		.success()
		.stdout("");

	Ok(())
}

#[test]
fn validate_passes_for_complete_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.arg("validate")
		.assert()
		.success()
		.stdout("PASSED\n");

	Ok(())
}

#[test]
fn validate_reports_first_missing_section() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let content = CONFIG.replace("caching:", "cache:");
	let config = write_file(tmp.path(), "texcfg.yml", &content)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.arg("validate")
		.assert()
		.code(1)
		.stdout("")
		.stderr(predicates::str::contains(
			"error: missing required section: `caching`",
		));

	Ok(())
}

#[test]
fn validate_reports_missing_value() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let content = CONFIG.replace("cache_version: v3", "cache_version: \"\"");
	let config = write_file(tmp.path(), "texcfg.yml", &content)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.arg("validate")
		.assert()
		.code(1)
		.stderr(predicates::str::contains(
			"missing required value: `texlive.cache_version`",
		));

	Ok(())
}

#[test]
fn verbose_errors_include_diagnostic_code() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;

	texcfg_cmd()
		.arg("--config")
		.arg(&config)
		.args(["--verbose", "get", "texlive.scheme"])
		.assert()
		.code(1)
		.stderr(predicates::str::contains("texcfg::missing_required_value"));

	Ok(())
}

#[test]
fn missing_subcommand_fails() {
	texcfg_cmd().assert().code(2);
}

#[rstest]
#[case::get(&["get", "texlive.year"])]
#[case::validate(&["validate"])]
#[case::cache_key(&["cache-key", "--os", "linux"])]
#[case::commit_message(&["commit-message", "--var", "success_count=1"])]
#[case::discover(&["discover"])]
fn yq_backend_is_required_when_requested(#[case] args: &[&str]) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;
	let empty_path = tmp.path().join("bin");
	std::fs::create_dir_all(&empty_path)?;

	texcfg_cmd()
		.env("PATH", &empty_path)
		.arg("--config")
		.arg(&config)
		.args(["--backend", "yq"])
		.args(args)
		.assert()
		.code(3)
		.stdout("");

	Ok(())
}

/// A stand-in for mikefarah `yq` that answers every lookup itself.
#[cfg(unix)]
const FAKE_YQ: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "yq (https://github.com/mikefarah/yq/) version v4.44.1"
  exit 0
fi
case "$4" in
  .caching.key_template) echo '"yq-{year}-{os}"' ;;
  .texlive.year) echo 2031 ;;
  .git.commit_message) echo '"built {success_count} via yq"' ;;
  *) echo '"x"' ;;
esac
"#;

#[cfg(unix)]
#[rstest]
#[case::validate(&["validate"], "PASSED\n")]
#[case::get(&["get", "texlive.year"], "2031\n")]
#[case::cache_key(&["cache-key", "--os", "linux"], "yq-2031-linux\n")]
#[case::commit_message(&["commit-message", "--var", "success_count=2"], "built 2 via yq\n")]
fn commands_read_through_selected_backend(
	#[case] args: &[&str],
	#[case] expected: &str,
) -> AnyEmptyResult {
	use std::os::unix::fs::PermissionsExt;

	let tmp = tempfile::tempdir()?;
	let config = write_file(tmp.path(), "texcfg.yml", CONFIG)?;
	let yq = write_file(tmp.path(), "bin/yq", FAKE_YQ)?;
	std::fs::set_permissions(&yq, std::fs::Permissions::from_mode(0o755))?;

	texcfg_cmd()
		.env("PATH", tmp.path().join("bin"))
		.arg("--config")
		.arg(&config)
		.args(["--backend", "yq"])
		.args(args)
		.assert()
		.success()
		.stdout(predicates::str::diff(expected.to_string()));

	Ok(())
}
