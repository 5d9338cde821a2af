use std::{fs, path::Path, process::Command};

fn main() {
  println!("cargo:rerun-if-changed=.git/HEAD");
  if Path::new(".git/refs/heads").exists() {
    println!("cargo:rerun-if-changed=.git/refs/heads");
  }

  println!("cargo:rustc-env=GIT_COMMIT={}", git_commit());
}

fn git_commit() -> String {
  if let Ok(output) = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output() {
    if output.status.success() {
      return String::from_utf8_lossy(&output.stdout).trim().to_string();
    }
  }

  // No git binary: resolve HEAD by hand.
  let Ok(head) = fs::read_to_string(".git/HEAD") else {
    return "unknown".to_string();
  };
  let commit = match head.strip_prefix("ref: ") {
    Some(ref_path) => fs::read_to_string(format!(".git/{}", ref_path.trim())).unwrap_or_default(),
    None => head,
  };
  let commit = commit.trim();
  if commit.is_empty() {
    "unknown".to_string()
  } else {
    commit.chars().take(7).collect()
  }
}
