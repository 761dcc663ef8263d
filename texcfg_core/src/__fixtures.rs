use std::path::Path;
use std::path::PathBuf;

use crate::ConfigFormat;
use crate::ConfigTree;

pub const FULL_CONFIG: &str = r#"texlive:
  year: 2025
  cache_version: v7
  scheme: small
  packages:
    - latexmk
    - biber
    - fontspec
compilers:
  default: pdflatex
  allowed: [pdflatex, xelatex, lualatex]
compilation:
  max_parallel: 4
  retries: 2
  timeout_minutes: 15
  enabled: true
  notes: ~
file_patterns:
  include:
    - "**/*.tex"
  exclude:
    - "drafts/"
caching:
  key_template: "tl-{year}-{version}-{os}"
git:
  user:
    name: build-bot
    email: build-bot@example.com
  commit_message: "docs: build {success_count} PDFs ({timestamp})"
"#;

pub fn full_tree() -> ConfigTree {
	yaml_tree(FULL_CONFIG)
}

pub fn yaml_tree(content: &str) -> ConfigTree {
	ConfigTree::parse(content, ConfigFormat::Yaml, "fixture.yml")
		.unwrap_or_else(|e| panic!("fixture should parse: {e}"))
}

pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
	let path = dir.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create {parent:?}: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write {path:?}: {e}"));
	path
}

/// Write an executable `/bin/sh` script standing in for an external tool.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
	use std::os::unix::fs::PermissionsExt;

	let path = write_file(dir, name, &format!("#!/bin/sh\n{body}"));
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
		.unwrap_or_else(|e| panic!("chmod {path:?}: {e}"));
	path
}

/// A fake mikefarah `yq` answering a fixed set of expressions in JSON.
#[cfg(unix)]
pub const FAKE_YQ: &str = r#"if [ "$1" = "--version" ]; then
  echo "yq (https://github.com/mikefarah/yq/) version v4.44.1"
  exit 0
fi
case "$4" in
  .texlive.year) echo 2025 ;;
  .texlive.cache_version) echo '"v7"' ;;
  .texlive.packages) echo '["latexmk", "biber"]' ;;
  .missing) echo null ;;
  *) echo "Error: cannot evaluate $4" >&2; exit 1 ;;
esac
"#;
