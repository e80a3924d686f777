//! Object-name extraction.
//!
//! A battery of clause extractors finds every object a statement touches so
//! each one can be checked against the exclusion rules. Coverage matters more
//! than precision here: a clause that is not scanned is a way to read an
//! excluded object through a join.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::sync::LazyLock;

/// One identifier part: quoted, backticked, bracketed, or bare.
const IDENT: &str = r#"(?:"[^"]+"|`[^`]+`|\[[^\]]+\]|[A-Za-z_$][\w$]*)"#;

/// Words that end a `FROM` relation list.
const CLAUSE_KEYWORDS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "FETCH", "QUALIFY", "WINDOW",
    "UNION", "EXCEPT", "INTERSECT", "MINUS", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS",
    "NATURAL", "ASOF", "ON", "USING", "CONNECT", "START", "PIVOT", "UNPIVOT", "MATCH_RECOGNIZE",
    "SET", "VALUES", "WHEN",
];

/// Bare words a clause extractor can land on that never name an object.
fn is_keyword(raw: &str) -> bool {
    let upper = raw.to_ascii_uppercase();
    upper == "LATERAL" || CLAUSE_KEYWORDS.contains(&upper.as_str())
}

/// How a clause extractor turns its match into names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// One name; a following `(` marks a table function and is skipped.
    Relation,
    /// One name, parentheses after it are a column list.
    Target,
    /// The clause is the whole pattern; group 1 is a name inside a string
    /// literal.
    Literal,
}

struct ClauseExtractor {
    pattern: Regex,
    capture: Capture,
}

fn name_pattern() -> String {
    format!(r"({IDENT}(?:\s*\.\s*{IDENT})*)")
}

fn extractor(clause: &str, capture: Capture) -> ClauseExtractor {
    let name = name_pattern();
    let source = match capture {
        Capture::Relation => format!(r"{clause}\s+{name}(\s*\()?"),
        Capture::Target => format!(r"{clause}\s+{name}"),
        Capture::Literal => clause.to_string(),
    };
    let pattern = RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .expect("built-in extractor pattern must compile");
    ClauseExtractor { pattern, capture }
}

static EXTRACTORS: LazyLock<Vec<ClauseExtractor>> = LazyLock::new(|| {
    vec![
        extractor(
            r"\b(?:(?:NATURAL\s+)?(?:INNER|CROSS|OUTER|(?:LEFT|RIGHT|FULL)(?:\s+OUTER)?)\s+)?JOIN",
            Capture::Relation,
        ),
        extractor(r"\bUSING", Capture::Relation),
        extractor(r"\bINTO", Capture::Target),
        extractor(
            r"\b(?:CREATE|ALTER|DROP)\s+(?:OR\s+REPLACE\s+)?(?:(?:LOCAL\s+|GLOBAL\s+)?(?:TEMP|TEMPORARY|TRANSIENT|VOLATILE)\s+)?TABLE(?:\s+IF\s+(?:NOT\s+)?EXISTS)?",
            Capture::Target,
        ),
        extractor(r"\bUPDATE", Capture::Target),
        extractor(r"\bTRUNCATE(?:\s+TABLE)?(?:\s+IF\s+EXISTS)?", Capture::Target),
        extractor(
            r"(?:^|;)\s*(?:DESCRIBE|DESC)(?:\s+(?:TABLE|VIEW|SCHEMA|DATABASE|STAGE|TASK|FUNCTION|PROCEDURE))?",
            Capture::Target,
        ),
        extractor(r"\bIN\s+(?:DATABASE|SCHEMA)", Capture::Target),
        extractor(
            r"\bGET_DDL\s*\(\s*'[^']*'\s*,\s*'([^'(]+)",
            Capture::Literal,
        ),
    ]
});

static FROM_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\bFROM\b")
        .case_insensitive(true)
        .build()
        .expect("built-in FROM pattern must compile")
});

static LEADING_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{}(\s*\()?", name_pattern()))
        .expect("built-in name pattern must compile")
});

static NAME_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENT).expect("built-in identifier pattern must compile"));

/// Removes surrounding quote, backtick, or bracket characters from every part
/// of a dotted name.
fn clean_name(raw: &str) -> String {
    NAME_PART
        .find_iter(raw)
        .map(|part| {
            part.as_str()
                .trim_matches(|c| matches!(c, '"' | '`' | '\'' | '[' | ']'))
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Replaces `--`, `//` and `/* */` comments with spaces, byte for byte, so
/// offsets into the result are offsets into `sql`. Quoted text is kept.
fn blank_comments(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            out.push(b);
            if b == b'\\' && q == b'\'' {
                if let Some(&next) = bytes.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        let next = bytes.get(i + 1).copied();
        match (b, next) {
            (b'\'' | b'"' | b'`', _) => {
                quote = Some(b);
                out.push(b);
                i += 1;
            }
            (b'-', Some(b'-')) | (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out.push(b' ');
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                out.extend_from_slice(b"  ");
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    out.push(if bytes[i] == b'\n' { b'\n' } else { b' ' });
                    i += 1;
                }
                if i < bytes.len() {
                    out.extend_from_slice(b"  ");
                    i += 2;
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    // Only whole characters or ASCII blanks were written.
    String::from_utf8(out).unwrap_or_else(|_| sql.to_string())
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Splits the relation list that starts at `start` on top-level commas.
///
/// The list ends at a clause keyword, a `;`, or the `)` closing an enclosing
/// subquery. Commas inside parentheses or quotes do not split.
fn split_from_clause(sql: &str, start: usize) -> Vec<(usize, &str)> {
    let bytes = sql.as_bytes();
    let mut pieces = Vec::new();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut piece_start = start;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b';' => break,
            b'(' => depth += 1,
            b')' if depth == 0 => break,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                pieces.push((piece_start, &sql[piece_start..i]));
                piece_start = i + 1;
            }
            _ if depth == 0 && is_word_byte(b) && (i == 0 || !is_word_byte(bytes[i - 1])) => {
                let end = bytes[i..]
                    .iter()
                    .position(|&c| !is_word_byte(c))
                    .map_or(bytes.len(), |n| i + n);
                let word = sql[i..end].to_ascii_uppercase();
                if CLAUSE_KEYWORDS.contains(&word.as_str()) {
                    break;
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    pieces.push((piece_start, &sql[piece_start..i]));
    pieces
}

/// The relation named at the head of one `FROM` list item, if it is a plain
/// object. Subqueries, `TABLE(...)` calls, table functions and `LATERAL`
/// items name nothing here; their inner `FROM` clauses are scanned on their
/// own.
fn leading_relation(piece: &str) -> Option<(usize, &str)> {
    let trimmed = piece.trim_start();
    let lead = piece.len() - trimmed.len();
    let head_word = trimmed.split(|c: char| !c.is_ascii_alphanumeric() && c != '_').next();
    if head_word.is_some_and(|w| w.eq_ignore_ascii_case("LATERAL")) {
        return None;
    }
    let caps = LEADING_NAME.captures(trimmed)?;
    if caps.get(2).is_some() {
        return None;
    }
    caps.get(1).map(|m| (lead + m.start(), m.as_str()))
}

/// Every relation of every `FROM` list in `sql`, with its offset.
fn from_relations(sql: &str) -> Vec<(usize, String)> {
    FROM_KEYWORD
        .find_iter(sql)
        .flat_map(|m| split_from_clause(sql, m.end()))
        .filter_map(|(start, piece)| {
            leading_relation(piece).map(|(pos, name)| (start + pos, name.to_string()))
        })
        .collect()
}

/// Extracts every object name referenced by `sql`, deduplicated in
/// first-seen order.
///
/// Scans `FROM` lists, every `JOIN` variant, `USING` sources, `INTO`,
/// `CREATE|ALTER|DROP TABLE`, `UPDATE`, `TRUNCATE`, `DESCRIBE` targets,
/// `IN DATABASE|SCHEMA` scopes and `GET_DDL` name literals across all
/// statements in the text. Comments count as whitespace.
pub fn extract_object_names(sql: &str) -> Vec<String> {
    let sql = blank_comments(sql);
    let mut found = from_relations(&sql);

    for extractor in EXTRACTORS.iter() {
        for caps in extractor.pattern.captures_iter(&sql) {
            let Some(m) = caps.get(1) else { continue };
            match extractor.capture {
                Capture::Relation => {
                    if caps.get(2).is_none() {
                        found.push((m.start(), m.as_str().to_string()));
                    }
                }
                Capture::Target | Capture::Literal => {
                    found.push((m.start(), m.as_str().to_string()))
                }
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|(_, raw)| !is_keyword(raw))
        .map(|(_, raw)| clean_name(&raw))
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}
