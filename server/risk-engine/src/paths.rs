//! Path classification: protected files/prefixes and test-file naming.

/// Forward slashes, no leading "./".
pub fn normalize_path(path: &str) -> String {
  let p = path.replace('\\', "/");
  let mut s = p.as_str();
  while let Some(rest) = s.strip_prefix("./") {
    s = rest;
  }
  s.to_string()
}

fn basename(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

/// Sensitive paths. Basenames match exactly; prefixes match the normalized path.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
  pub protected_files: Vec<String>,
  pub protected_prefixes: Vec<String>,
}

impl Default for ScoringPolicy {
  fn default() -> Self {
    Self {
      protected_files: [
        "package.json",
        "package-lock.json",
        "Cargo.toml",
        "Cargo.lock",
        ".env",
        "tsconfig.json",
        "Dockerfile",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      protected_prefixes: ["src/auth/", "src/security/", "migrations/", ".github/", "config/"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
  }
}

impl ScoringPolicy {
  pub fn is_protected(&self, path: &str) -> bool {
    let p = normalize_path(path);
    let name = basename(&p);
    self.protected_files.iter().any(|f| f == name)
      || self
        .protected_prefixes
        .iter()
        .any(|prefix| p.starts_with(&normalize_path(prefix)))
  }
}

/// Test/spec naming conventions (case-insensitive).
pub fn is_test_file(path: &str) -> bool {
  let p = normalize_path(path).to_lowercase();
  let name = basename(&p);
  name.contains(".test.")
    || name.contains(".spec.")
    || name.contains("_test.")
    || name.contains("_spec.")
    || p.contains("/tests/")
    || p.contains("/test/")
    || p.contains("/__tests__/")
    || p.contains("/spec/")
    || p.starts_with("tests/")
    || p.starts_with("test/")
    || p.starts_with("__tests__/")
}
