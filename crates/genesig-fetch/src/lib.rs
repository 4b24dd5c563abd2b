//! genesig-fetch — Corpus acquisition collaborators: PubMed Central
//! metadata via E-utilities and full-text download from the PMC Open
//! Access buckets. The extraction core performs no network calls; all
//! transport, bounded fan-out, and retries live here.

pub mod entrez;
pub mod retry;
pub mod texts;

pub use entrez::{ArticleInfoRow, EntrezClient};
pub use retry::RetryPolicy;
pub use texts::{pmcid_from_filename, TextFetcher};
