//! Function-like and exported symbol extraction from JS/TS source text.
//!
//! The default extractor is lexical: comment stripping, per-line regexes, and
//! brace-depth tracking to find class bodies. It is permissive on purpose and
//! never fails; text it cannot make sense of contributes no symbols.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

/// Declared symbols of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
  /// Top-level functions, `Class.method`, function-shaped variable bindings.
  pub functions: BTreeSet<String>,
  pub exports: BTreeSet<String>,
}

/// Given source text, return declared function-like and exported names.
pub trait SymbolExtractor {
  fn extract(&self, source: &str) -> SymbolTable;
}

/// Regex + brace-depth heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalExtractor;

lazy_static! {
  static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
  static ref LINE_COMMENT: Regex = Regex::new(r"(?m)(^|[\s;{}])//.*$").unwrap();
  static ref FUNCTION_DECL: Regex = Regex::new(
    r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*[<(]"
  )
  .unwrap();
  static ref CLASS_DECL: Regex = Regex::new(
    r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)"
  )
  .unwrap();
  static ref METHOD_DECL: Regex = Regex::new(
    r"^\s*(?:(?:public|private|protected|static|async|override|readonly|get|set)\s+)*\*?\s*#?([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\("
  )
  .unwrap();
  static ref METHOD_PROPERTY: Regex = Regex::new(
    r"^\s*(?:(?:public|private|protected|static|readonly)\s+)*#?([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\b|function\b|\([^)]*\)[^=;]*=>|[A-Za-z_$][\w$]*\s*=>)"
  )
  .unwrap();
  static ref FUNCTION_BINDING: Regex = Regex::new(
    r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\b|function\b|\([^)]*\)[^=;]*=>|[A-Za-z_$][\w$]*\s*=>|\(\s*$)"
  )
  .unwrap();
  static ref EXPORT_DECL: Regex = Regex::new(
    r"(?m)^\s*export\s+(?:declare\s+)?(?:default\s+)?(?:async\s+)?(?:function\s*\*?|abstract\s+class|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)"
  )
  .unwrap();
  static ref EXPORT_DEFAULT: Regex = Regex::new(r"(?m)^\s*export\s+default\b").unwrap();
  static ref EXPORT_LIST: Regex = Regex::new(r"(?s)export\s*(?:type\s*)?\{([^}]*)\}").unwrap();
  static ref COMMONJS_MEMBER: Regex =
    Regex::new(r"(?m)(?:^|[^\w$.])(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=").unwrap();
  static ref COMMONJS_OBJECT: Regex =
    Regex::new(r"(?s)module\.exports\s*=\s*\{([^}]*)\}").unwrap();
  static ref COMMONJS_IDENT: Regex =
    Regex::new(r"(?m)module\.exports\s*=\s*([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap();
  static ref IDENT: Regex = Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap();
}

const NOT_METHODS: &[&str] = &[
  "if", "for", "while", "switch", "catch", "return", "function", "do", "else", "await", "typeof",
  "super", "yield", "throw",
];

impl SymbolExtractor for LexicalExtractor {
  fn extract(&self, source: &str) -> SymbolTable {
    let text = strip_comments(source);
    SymbolTable {
      functions: extract_functions(&text),
      exports: extract_exports(&text),
    }
  }
}

fn strip_comments(source: &str) -> String {
  let without_blocks = BLOCK_COMMENT.replace_all(source, " ");
  LINE_COMMENT.replace_all(&without_blocks, "$1").into_owned()
}

/// Brace scanner that skips string and template literal contents.
#[derive(Default)]
struct BraceScanner {
  depth: usize,
  quote: Option<char>,
}

impl BraceScanner {
  /// Consume one line. Calls `on_open(depth_after)` for each `{` seen.
  fn scan(&mut self, line: &str, mut on_open: impl FnMut(usize)) {
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
      match self.quote {
        Some(q) => {
          if c == '\\' {
            chars.next();
          } else if c == q {
            self.quote = None;
          }
        }
        None => match c {
          '"' | '\'' | '`' => self.quote = Some(c),
          '{' => {
            self.depth += 1;
            on_open(self.depth);
          }
          '}' => self.depth = self.depth.saturating_sub(1),
          _ => {}
        },
      }
    }
    // Plain string literals do not span lines; templates do.
    if matches!(self.quote, Some('"') | Some('\'')) {
      self.quote = None;
    }
  }
}

fn extract_functions(text: &str) -> BTreeSet<String> {
  let mut out = BTreeSet::new();
  let mut scanner = BraceScanner::default();
  // (class name, body depth)
  let mut classes: Vec<(String, usize)> = Vec::new();
  let mut pending_class: Option<String> = None;

  for line in text.lines() {
    let depth = scanner.depth;
    if scanner.quote.is_some() {
      scanner.scan(line, |_| {});
      continue;
    }
    while classes.last().is_some_and(|(_, body)| depth < *body) {
      classes.pop();
    }

    let in_class_body = classes.last().filter(|(_, body)| *body == depth);

    if let Some(caps) = CLASS_DECL.captures(line) {
      pending_class = Some(caps[1].to_string());
    } else if let Some((class, _)) = in_class_body {
      let name = METHOD_DECL
        .captures(line)
        .or_else(|| METHOD_PROPERTY.captures(line))
        .map(|c| c[1].to_string());
      if let Some(name) = name {
        if !NOT_METHODS.contains(&name.as_str()) {
          out.insert(format!("{}.{}", class, name));
        }
      }
    } else if depth == 0 {
      if let Some(caps) = FUNCTION_DECL.captures(line) {
        out.insert(caps[1].to_string());
      } else if let Some(caps) = FUNCTION_BINDING.captures(line) {
        out.insert(caps[1].to_string());
      }
    }

    scanner.scan(line, |after| {
      if let Some(name) = pending_class.take() {
        classes.push((name, after));
      }
    });
  }
  out
}

fn extract_exports(text: &str) -> BTreeSet<String> {
  let mut out = BTreeSet::new();

  for caps in EXPORT_DECL.captures_iter(text) {
    out.insert(caps[1].to_string());
  }

  // `export default` with no declaration name of its own exports "default".
  for m in EXPORT_DEFAULT.find_iter(text) {
    let rest = &text[m.end()..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let named = EXPORT_DECL.is_match(&format!("export {}", rest[..line_end].trim_start()));
    if !named {
      out.insert("default".to_string());
    }
  }

  for caps in EXPORT_LIST.captures_iter(text) {
    for item in caps[1].split(',') {
      let item = item.trim().trim_start_matches("type ").trim();
      let exported = match item.split_once(" as ") {
        Some((_, alias)) => alias.trim(),
        None => item,
      };
      if IDENT.is_match(exported) {
        out.insert(exported.to_string());
      }
    }
  }

  for caps in COMMONJS_MEMBER.captures_iter(text) {
    out.insert(caps[1].to_string());
  }

  for caps in COMMONJS_OBJECT.captures_iter(text) {
    for item in caps[1].split(',') {
      let key = item.split(':').next().unwrap_or("").trim();
      let key = key.split('(').next().unwrap_or("").trim();
      let key = key.trim_start_matches("async ").trim();
      if IDENT.is_match(key) {
        out.insert(key.to_string());
      }
    }
  }

  for caps in COMMONJS_IDENT.captures_iter(text) {
    out.insert(caps[1].to_string());
  }

  out
}
