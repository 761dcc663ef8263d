#![allow(dead_code)]

use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub const CONFIG: &str = r#"texlive:
  year: 2025
  cache_version: v3
  packages:
    - latexmk
    - biber
compilers:
  default: pdflatex
compilation:
  max_parallel: 4
  notes: ~
file_patterns:
  include:
    - "**/*.tex"
  exclude:
    - "drafts/"
caching:
  key_template: "texlive-{year}-{version}-{os}"
git:
  user:
    name: build-bot
    email: build-bot@example.com
"#;

pub fn texcfg_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("texcfg"));
	cmd.env("NO_COLOR", "1")
		.env_remove("TEXCFG_CONFIG")
		.env_remove("TEXCFG_LOG");
	cmd
}

/// Write `content` to `relative` under `dir`, creating parent directories.
pub fn write_file(dir: &Path, relative: &str, content: &str) -> std::io::Result<PathBuf> {
	let path = dir.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&path, content)?;
	Ok(path)
}
