//! Structural change analysis between two snapshots of one file.

use std::fs;
use std::path::Path;

use crate::symbols::{LexicalExtractor, SymbolExtractor};
use crate::types::Analysis;

/// Analyze two in-memory snapshots with the default extractor.
pub fn analyze_sources(before: &str, after: &str) -> Analysis {
  analyze_sources_with(&LexicalExtractor, before, after)
}

pub fn analyze_sources_with(
  extractor: &dyn SymbolExtractor,
  before: &str,
  after: &str,
) -> Analysis {
  let b = extractor.extract(before);
  let a = extractor.extract(after);

  let deleted = b.functions.difference(&a.functions).count() as u32;
  let added = a.functions.difference(&b.functions).count() as u32;
  let total = (b.functions.len() + a.functions.len()) as u32;
  let deleted_exports = b.exports.difference(&a.exports).count() as u32;

  Analysis {
    structural_change_percent: change_percent(deleted + added, total),
    deleted_functions: deleted,
    added_functions: added,
    deleted_exports,
    error: None,
  }
}

/// Read both snapshots from disk. Never fails: a missing input yields a zeroed
/// result carrying "File not found: <path>" (before path checked first).
pub fn analyze_paths(before_path: impl AsRef<Path>, after_path: impl AsRef<Path>) -> Analysis {
  analyze_paths_with(&LexicalExtractor, before_path, after_path)
}

pub fn analyze_paths_with(
  extractor: &dyn SymbolExtractor,
  before_path: impl AsRef<Path>,
  after_path: impl AsRef<Path>,
) -> Analysis {
  let before_path = before_path.as_ref();
  let after_path = after_path.as_ref();

  let before = match read_lossy(before_path) {
    Some(s) => s,
    None => return Analysis::not_found(&before_path.display().to_string()),
  };
  let after = match read_lossy(after_path) {
    Some(s) => s,
    None => return Analysis::not_found(&after_path.display().to_string()),
  };
  analyze_sources_with(extractor, &before, &after)
}

// Non-UTF-8 content is tolerated; the extractor just sees replacement chars.
fn read_lossy(path: &Path) -> Option<String> {
  fs::read(path)
    .ok()
    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// round(100 * changed / total), 0 when total is 0.
fn change_percent(changed: u32, total: u32) -> u32 {
  if total == 0 {
    return 0;
  }
  ((100.0 * changed as f64) / total as f64).round().min(100.0) as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::symbols::SymbolTable;

  fn functions(names: &[&str]) -> String {
    names
      .iter()
      .map(|n| format!("function {}() {{\n  return 1;\n}}\n", n))
      .collect()
  }

  #[test]
  fn identical_snapshots_are_zero() {
    let src = functions(&["a", "b", "c"]);
    let out = analyze_sources(&src, &src);
    assert_eq!(out.structural_change_percent, 0);
    assert_eq!(out.deleted_functions, 0);
    assert_eq!(out.deleted_exports, 0);
    assert!(out.error.is_none());
  }

  #[test]
  fn ten_to_five_deletes_five() {
    let names = ["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9"];
    let out = analyze_sources(&functions(&names), &functions(&names[..5]));
    assert_eq!(out.deleted_functions, 5);
    assert_eq!(out.added_functions, 0);
    assert_eq!(out.structural_change_percent, 33);
  }

  #[test]
  fn rename_counts_as_delete_plus_add() {
    let out = analyze_sources(&functions(&["a", "b"]), &functions(&["a", "c"]));
    assert_eq!(out.deleted_functions, 1);
    assert_eq!(out.added_functions, 1);
    // 2 changed of 4 total
    assert_eq!(out.structural_change_percent, 50);
  }

  #[test]
  fn empty_snapshots_have_no_denominator() {
    let out = analyze_sources("", "const x = 1;");
    assert_eq!(out.structural_change_percent, 0);
  }

  #[test]
  fn deleted_exports_counted() {
    let before = "export function a() {}\nexport const b = 1;\n";
    let after = "export function a() {}\n";
    assert_eq!(analyze_sources(before, after).deleted_exports, 1);
  }

  #[test]
  fn missing_path_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("after.ts");
    fs::write(&present, "function a() {}\n").unwrap();
    let missing = dir.path().join("nope.ts");

    let out = analyze_paths(&missing, &present);
    let err = out.error.unwrap();
    assert!(err.starts_with("File not found: "));
    assert!(err.contains("nope.ts"));
    assert_eq!(out.structural_change_percent, 0);
    assert_eq!(out.deleted_functions, 0);
    assert_eq!(out.deleted_exports, 0);

    let out = analyze_paths(&present, &missing);
    assert!(out.error.unwrap().contains("nope.ts"));
  }

  struct Fixed(SymbolTable, SymbolTable);

  impl SymbolExtractor for Fixed {
    fn extract(&self, source: &str) -> SymbolTable {
      if source == "before" {
        self.0.clone()
      } else {
        self.1.clone()
      }
    }
  }

  #[test]
  fn extractor_is_swappable() {
    let mut before = SymbolTable::default();
    before.functions.insert("x".into());
    before.exports.insert("x".into());
    let out = analyze_sources_with(&Fixed(before, SymbolTable::default()), "before", "after");
    assert_eq!(out.deleted_functions, 1);
    assert_eq!(out.deleted_exports, 1);
    assert_eq!(out.structural_change_percent, 100);
  }
}
