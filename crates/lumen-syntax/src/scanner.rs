//! Header scanner: recovers the `package`/`import` prologue of a file.
//!
//! Columns are UTF-8 byte offsets, matching the compiler's native positions.
//! Scanning stops at the first line that is not blank, a comment, a package
//! declaration or an import.

use crate::{File, ImportContent, ImportKind, ImportSpec, PackageDecl, Token};
use lumen_position::{Position, Range};
use lumen_symbols::Modifier;

struct LineCursor<'a> {
    file_id: u32,
    line: i32,
    text: &'a str,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(file_id: u32, line: i32, text: &'a str) -> Self {
        Self { file_id, line, text, pos: 0 }
    }

    fn at(&self, col: usize) -> Position {
        Position::in_file(self.file_id, self.line, col as i32)
    }

    fn here(&self) -> Position {
        self.at(self.pos)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn read_ident(&mut self) -> Option<(String, usize)> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return None;
        }
        Some((self.text[start..self.pos].to_string(), start))
    }

    fn at_comment(&self) -> bool {
        self.text[self.pos..].starts_with("//")
    }

    fn done(&self) -> bool {
        self.pos >= self.text.len()
    }
}

/// Tokenizes full source into identifier and punctuation tokens.
///
/// Comment and whitespace runs are dropped; everything else becomes a token
/// with byte-column positions, which is all the position converters need.
pub fn tokenize(file_id: u32, source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        let mut cur = LineCursor::new(file_id, line_no as i32, line);
        loop {
            cur.skip_ws();
            if cur.done() || cur.at_comment() {
                break;
            }
            if let Some((word, start)) = cur.read_ident() {
                tokens.push(Token {
                    value: word,
                    begin: cur.at(start),
                    end: cur.here(),
                });
                continue;
            }
            // Single punctuation character (or any other non-ident char).
            let start = cur.pos;
            if let Some(ch) = cur.peek() {
                cur.pos += ch.len_utf8();
                tokens.push(Token {
                    value: ch.to_string(),
                    begin: cur.at(start),
                    end: cur.here(),
                });
            }
        }
    }
    tokens
}

/// Scans the header of `source` into a [`File`].
pub fn scan_header(file_id: u32, path: &str, source: &str) -> File {
    let mut file = File {
        file_id,
        path: path.to_string(),
        package: None,
        imports: Vec::new(),
        tokens: tokenize(file_id, source),
    };

    for (line_no, line) in source.lines().enumerate() {
        let mut cur = LineCursor::new(file_id, line_no as i32, line);
        cur.skip_ws();
        if cur.done() || cur.at_comment() {
            continue;
        }
        let Some((first, first_col)) = cur.read_ident() else {
            break;
        };
        let modifier = Modifier::from_keyword(&first);
        let (keyword, stmt_col) = if modifier == Modifier::Undefined {
            (first, first_col)
        } else {
            cur.skip_ws();
            match cur.read_ident() {
                Some((word, _)) => (word, first_col),
                None => break,
            }
        };
        match keyword.as_str() {
            "package" => {
                cur.skip_ws();
                if let Some(decl) = scan_package(&mut cur) {
                    file.package = Some(decl);
                }
            }
            "import" => {
                cur.skip_ws();
                scan_import(&mut cur, stmt_col, modifier, &mut file.imports);
            }
            _ => break,
        }
    }
    file
}

fn scan_package(cur: &mut LineCursor<'_>) -> Option<PackageDecl> {
    let (first, first_col) = cur.read_ident()?;
    let mut segments = vec![first];
    let mut end = cur.pos;
    while cur.eat('.') {
        let (seg, _) = cur.read_ident()?;
        segments.push(seg);
        end = cur.pos;
    }
    Some(PackageDecl {
        full_name: segments.join("."),
        name_range: Range::new(cur.at(first_col), cur.at(end)),
    })
}

fn scan_import(
    cur: &mut LineCursor<'_>,
    stmt_col: usize,
    modifier: Modifier,
    imports: &mut Vec<ImportSpec>,
) {
    let mut prefix_paths = Vec::new();
    let mut prefix_positions = Vec::new();
    let Some((first, first_col)) = cur.read_ident() else {
        return;
    };
    prefix_paths.push(first);
    prefix_positions.push(cur.at(first_col));
    loop {
        if !cur.eat('.') {
            // `import K`: a root-package symbol import.
            let identifier = prefix_paths.pop().unwrap_or_default();
            prefix_positions.pop();
            let alias = scan_alias(cur);
            let kind = if alias.is_some() { ImportKind::Alias } else { ImportKind::Single };
            imports.push(ImportSpec {
                range: Range::new(cur.at(stmt_col), cur.here()),
                modifier,
                content: ImportContent {
                    kind,
                    prefix_paths,
                    prefix_positions,
                    identifier,
                    alias,
                    ..ImportContent::default()
                },
            });
            return;
        }
        match cur.peek() {
            Some('*') => {
                cur.eat('*');
                imports.push(ImportSpec {
                    range: Range::new(cur.at(stmt_col), cur.here()),
                    modifier,
                    content: ImportContent {
                        kind: ImportKind::All,
                        prefix_paths,
                        prefix_positions,
                        identifier: "*".to_string(),
                        ..ImportContent::default()
                    },
                });
                return;
            }
            Some('{') => {
                scan_multi(cur, stmt_col, modifier, prefix_paths, prefix_positions, imports);
                return;
            }
            _ => {
                let Some((seg, col)) = cur.read_ident() else {
                    return;
                };
                prefix_paths.push(seg);
                prefix_positions.push(cur.at(col));
            }
        }
    }
}

fn scan_alias(cur: &mut LineCursor<'_>) -> Option<String> {
    let mark = cur.pos;
    cur.skip_ws();
    match cur.read_ident() {
        Some((word, _)) if word == "as" => {
            cur.skip_ws();
            match cur.read_ident() {
                Some((alias, _)) => Some(alias),
                None => {
                    cur.pos = mark;
                    None
                }
            }
        }
        _ => {
            cur.pos = mark;
            None
        }
    }
}

fn scan_multi(
    cur: &mut LineCursor<'_>,
    stmt_col: usize,
    modifier: Modifier,
    prefix_paths: Vec<String>,
    prefix_positions: Vec<Position>,
    imports: &mut Vec<ImportSpec>,
) {
    cur.eat('{');
    let mut members: Vec<ImportSpec> = Vec::new();
    let mut items = Vec::new();
    let mut comma_positions = Vec::new();
    let right_brace;
    loop {
        cur.skip_ws();
        if cur.peek() == Some('}') {
            right_brace = cur.here();
            cur.eat('}');
            break;
        }
        let Some((name, name_col)) = cur.read_ident() else {
            return; // unterminated statement, nothing usable
        };
        let alias = scan_alias(cur);
        let member_kind = if alias.is_some() { ImportKind::Alias } else { ImportKind::Single };
        items.push(name.clone());
        members.push(ImportSpec {
            range: Range::new(cur.at(name_col), cur.here()),
            modifier,
            content: ImportContent {
                kind: member_kind,
                prefix_paths: prefix_paths.clone(),
                prefix_positions: prefix_positions.clone(),
                identifier: name,
                alias,
                ..ImportContent::default()
            },
        });
        cur.skip_ws();
        if cur.peek() == Some(',') {
            comma_positions.push(cur.here());
            cur.eat(',');
        } else if cur.peek() != Some('}') {
            return;
        }
    }
    imports.append(&mut members);
    imports.push(ImportSpec {
        range: Range::new(cur.at(stmt_col), cur.here()),
        modifier,
        content: ImportContent {
            kind: ImportKind::Multi,
            prefix_paths,
            prefix_positions,
            identifier: String::new(),
            alias: None,
            items,
            comma_positions,
            right_brace,
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_declaration() {
        let file = scan_header(1, "/w/a/b/one.lm", "package a.b\n");
        let pkg = file.package.expect("package decl");
        assert_eq!(pkg.full_name, "a.b");
        assert_eq!(pkg.name_range.start, Position::new(0, 8));
        assert_eq!(pkg.name_range.end, Position::new(0, 11));
    }

    #[test]
    fn test_single_import() {
        let src = "package a.b\nimport c.d.Foo\n";
        let file = scan_header(1, "/w/a/b/one.lm", src);
        assert_eq!(file.imports.len(), 1);
        let imp = &file.imports[0];
        assert_eq!(imp.content.kind, ImportKind::Single);
        assert_eq!(imp.content.full_package(), "c.d");
        assert_eq!(imp.content.full_symbol().as_deref(), Some("c.d.Foo"));
        assert_eq!(imp.range.start, Position::new(1, 0));
        assert_eq!(imp.range.end, Position::new(1, 14));
    }

    #[test]
    fn test_reexport_modifier() {
        let src = "package a.b\npublic import c.d.Foo\n";
        let file = scan_header(1, "/w/a/b/one.lm", src);
        let imp = &file.imports[0];
        assert_eq!(imp.modifier, Modifier::Public);
        assert!(imp.modifier.is_reexport());
        // statement range starts at the modifier keyword
        assert_eq!(imp.range.start, Position::new(1, 0));
    }

    #[test]
    fn test_alias_import() {
        let file = scan_header(1, "/w/x.lm", "package a\nimport c.d.Foo as Bar\n");
        let imp = &file.imports[0];
        assert_eq!(imp.content.kind, ImportKind::Alias);
        assert_eq!(imp.content.alias.as_deref(), Some("Bar"));
        assert_eq!(imp.content.full_symbol().as_deref(), Some("c.d.Foo"));
    }

    #[test]
    fn test_import_all() {
        let file = scan_header(1, "/w/x.lm", "package a\nimport c.d.*\n");
        let imp = &file.imports[0];
        assert_eq!(imp.content.kind, ImportKind::All);
        assert_eq!(imp.content.full_package(), "c.d");
        assert_eq!(imp.content.full_symbol(), None);
    }

    #[test]
    fn test_multi_import_flattening() {
        let src = "package a\nimport c.d.{X, Y, Z}\n";
        let file = scan_header(1, "/w/x.lm", src);
        // three members plus the brace statement itself
        assert_eq!(file.imports.len(), 4);
        let multi = file
            .imports
            .iter()
            .find(|i| i.content.kind == ImportKind::Multi)
            .expect("multi spec");
        assert_eq!(multi.content.items, vec!["X", "Y", "Z"]);
        assert_eq!(multi.content.comma_positions.len(), 2);
        assert_eq!(multi.content.right_brace, Position::new(1, 19));
        assert_eq!(multi.range.end, Position::new(1, 20));
        let member_y = file
            .imports
            .iter()
            .find(|i| i.content.identifier == "Y")
            .expect("member Y");
        assert!(multi.range.encloses(member_y.range));
        assert_eq!(member_y.content.full_symbol().as_deref(), Some("c.d.Y"));
    }

    #[test]
    fn test_prefix_range() {
        let file = scan_header(1, "/w/x.lm", "package a\nimport c.d.Foo\n");
        let range = file.imports[0].content.prefix_range().expect("prefix range");
        assert_eq!(range.start, Position::new(1, 7));
        assert_eq!(range.end, Position::new(1, 10));
    }

    #[test]
    fn test_header_stops_at_first_decl() {
        let src = "package a\nimport c.d.Foo\n\n// docs\npublic class K {}\nimport e.f.G\n";
        let file = scan_header(1, "/w/x.lm", src);
        assert_eq!(file.imports.len(), 1);
    }

    #[test]
    fn test_tokenize_positions() {
        let tokens = tokenize(1, "import c.d\n");
        assert_eq!(tokens[0].value, "import");
        assert_eq!(tokens[1].value, "c");
        assert_eq!(tokens[1].begin, Position::new(0, 7));
        assert_eq!(tokens[2].value, ".");
        assert_eq!(tokens[3].value, "d");
    }
}
