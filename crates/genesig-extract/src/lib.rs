//! genesig-extract — Gene lexicon loading, safe gene-symbol regex
//! construction, and relevant-line selection over article texts.

pub mod lexicon;
pub mod pool;
pub mod regex;
pub mod select;

pub use lexicon::{GeneLexicon, GeneRecord};
pub use pool::{select_relevant, ArticleLines};
pub use regex::{GeneRegex, RegexError};
pub use select::{relevant_lines, REFS_SENTINEL};
