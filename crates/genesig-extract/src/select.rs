//! Relevant-line selection.
//!
//! A line is relevant when it mentions at least `threshold` distinct gene
//! symbols. Scanning stops at the references marker emitted by the PMC Open
//! Access text conversion; citation blocks are dense with gene symbols and
//! would otherwise flood the selection.

use crate::regex::GeneRegex;

/// Marker line that opens the references section in PMC OA plain text.
/// Lines are handled without their trailing newline.
pub const REFS_SENTINEL: &str = "==== Refs";

/// Lines mentioning at least `threshold` distinct gene symbols, in article
/// order, up to (excluding) the references sentinel.
pub fn relevant_lines<'a, I>(lines: I, regex: &GeneRegex, threshold: usize) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut relevant = Vec::new();
    for line in lines {
        if line == REFS_SENTINEL {
            break;
        }
        if regex.find_distinct(line).len() >= threshold {
            relevant.push(line);
        }
    }
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex() -> GeneRegex {
        GeneRegex::build(["GeneA", "GeneB", "GeneC"]).unwrap()
    }

    #[test]
    fn test_selection_stops_at_references() {
        let lines = ["GeneA GeneB", REFS_SENTINEL, "GeneA GeneB"];
        let selected = relevant_lines(lines, &regex(), 2);
        assert_eq!(selected, ["GeneA GeneB"]);
    }

    #[test]
    fn test_threshold_counts_distinct_symbols() {
        let lines = ["GeneA GeneA GeneA", "GeneA GeneB"];
        let selected = relevant_lines(lines, &regex(), 2);
        assert_eq!(selected, ["GeneA GeneB"]);
    }

    #[test]
    fn test_threshold_one_keeps_any_mention() {
        let lines = ["no genes here", "GeneC alone"];
        let selected = relevant_lines(lines, &regex(), 1);
        assert_eq!(selected, ["GeneC alone"]);
    }

    #[test]
    fn test_higher_threshold_selects_subset() {
        let lines = [
            "GeneA",
            "GeneA GeneB",
            "GeneA GeneB GeneC",
            "nothing",
        ];
        let regex = regex();
        for threshold in 1..4 {
            let wider = relevant_lines(lines, &regex, threshold);
            let narrower = relevant_lines(lines, &regex, threshold + 1);
            assert!(narrower.iter().all(|line| wider.contains(line)));
        }
    }

    #[test]
    fn test_no_sentinel_processes_all_lines() {
        let lines = ["GeneA GeneB", "filler", "GeneB GeneC"];
        let selected = relevant_lines(lines, &regex(), 2);
        assert_eq!(selected, ["GeneA GeneB", "GeneB GeneC"]);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let selected = relevant_lines([], &regex(), 2);
        assert!(selected.is_empty());
    }
}
