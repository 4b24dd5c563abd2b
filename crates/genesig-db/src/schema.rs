//! Relational schema.
//!
//! One row per article, per author, per (article, author) contribution,
//! per gene, per (gene, synonym) pair, and per confirmed
//! (article, gene) signature membership.

pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS Article (
    pmcid   TEXT PRIMARY KEY,
    doi     TEXT,
    title   TEXT,
    journal TEXT,
    volume  TEXT,
    issue   TEXT,
    pages   TEXT,
    date    TEXT
);

CREATE TABLE IF NOT EXISTS Author (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ArticleAuthor (
    article_pmcid TEXT NOT NULL,
    author_id     INTEGER NOT NULL,
    UNIQUE (article_pmcid, author_id),
    FOREIGN KEY (article_pmcid) REFERENCES Article (pmcid),
    FOREIGN KEY (author_id) REFERENCES Author (id)
);

CREATE TABLE IF NOT EXISTS Gene (
    ensembl_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    chromosome TEXT
);

CREATE TABLE IF NOT EXISTS GeneSynonym (
    gene_ensembl_id TEXT NOT NULL,
    name            TEXT NOT NULL,
    UNIQUE (gene_ensembl_id, name),
    FOREIGN KEY (gene_ensembl_id) REFERENCES Gene (ensembl_id)
);

CREATE TABLE IF NOT EXISTS GeneSignature (
    article_pmcid   TEXT NOT NULL,
    gene_ensembl_id TEXT NOT NULL,
    UNIQUE (article_pmcid, gene_ensembl_id),
    FOREIGN KEY (article_pmcid) REFERENCES Article (pmcid),
    FOREIGN KEY (gene_ensembl_id) REFERENCES Gene (ensembl_id)
);
";
