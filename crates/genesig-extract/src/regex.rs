//! Gene-symbol matching over free text.
//!
//! Builds a single alternation pattern from tens of thousands of gene names
//! and synonyms. Every symbol is escaped individually, so names like
//! `HLA-A*01:01` or `C1orf43` are matched literally. A symbol only counts
//! when it is not directly adjacent to another word character: `AR` must
//! match the standalone token but never the substring inside `CAR`.
//!
//! The boundary check is done on the characters surrounding each raw match
//! instead of with a consuming `(?:\A|\W)…(?:\z|\W)` wrapper. A consuming
//! wrapper eats the separator between two symbols, so only the first of
//! `GeneA GeneB` would ever match; the regex engine here also has no
//! lookaround. Alternatives are sorted longest-first because alternation is
//! leftmost-first: `ARID1A` has to win over its prefix `AR`.

use std::collections::BTreeSet;
use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Raised compile limit for lexicon-scale alternations. The default 10 MB
/// program budget is too small for ~80k escaped alternatives.
const REGEX_SIZE_LIMIT: usize = 1 << 28;

#[derive(Debug, Error)]
pub enum RegexError {
    #[error("gene lexicon is empty, refusing to build a match-nothing pattern")]
    EmptyLexicon,

    #[error("gene pattern failed to compile: {0}")]
    Build(#[from] regex::Error),
}

/// A compiled gene-symbol matcher. Immutable; share as `Arc<GeneRegex>`.
#[derive(Debug)]
pub struct GeneRegex {
    pattern: Regex,
    n_symbols: usize,
}

impl GeneRegex {
    /// Build from an iterator of gene names and synonyms. Duplicates and
    /// empty entries are dropped; an empty remainder is an error.
    pub fn build<I, S>(symbols: I) -> Result<Self, RegexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if unique.is_empty() {
            return Err(RegexError::EmptyLexicon);
        }

        // Longest symbols first so prefixes cannot shadow full names.
        let mut ordered: Vec<String> = unique.into_iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let n_symbols = ordered.len();

        let escaped: Vec<String> = ordered.iter().map(|s| regex::escape(s)).collect();
        let pattern = RegexBuilder::new(&escaped.join("|"))
            .size_limit(REGEX_SIZE_LIMIT)
            .build()?;

        tracing::debug!(n_symbols, "compiled gene-symbol pattern");
        Ok(Self { pattern, n_symbols })
    }

    pub fn symbol_count(&self) -> usize {
        self.n_symbols
    }

    /// Distinct gene symbols mentioned in one line. Repeated mentions of the
    /// same symbol count once. After a rejected match the scan resumes one
    /// character in, not past its end: a shorter symbol starting inside the
    /// rejected span is still eligible.
    pub fn find_distinct<'t>(&self, line: &'t str) -> HashSet<&'t str> {
        let mut found = HashSet::new();
        let mut at = 0;
        while let Some(m) = self.pattern.find_at(line, at) {
            let before = line[..m.start()].chars().next_back();
            let after = line[m.end()..].chars().next();
            if !before.is_some_and(is_word) && !after.is_some_and(is_word) {
                found.insert(m.as_str());
                at = m.end();
            } else {
                at = m.start()
                    + line[m.start()..].chars().next().map_or(1, char::len_utf8);
            }
        }
        found
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
