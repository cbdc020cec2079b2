use crate::models::AnswerOutcome;
use crate::QaError;
use regex::Regex;
use std::collections::BTreeSet;

pub const REFUSAL_MESSAGE: &str = "I do not know based on the provided documents.";

pub const BLOCKED_MESSAGE: &str = "The model generated an answer without explicit source citations. \
This response has been blocked to maintain academic integrity.";

const CITATION_PATTERN: &str = r"\[Source\s+(\d+)\]";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAnswer {
    pub text: String,
    pub outcome: AnswerOutcome,
}

/// Marker-presence check on generated answers.
///
/// Only requires one `[Source N]` somewhere in the text; it does not check that
/// every claim is cited or that `N` refers to a supplied source. Text without a
/// marker is replaced wholesale, the bare refusal sentence included.
#[derive(Debug, Clone)]
pub struct GroundingValidator {
    citation: Regex,
}

impl GroundingValidator {
    pub fn new() -> Result<Self, QaError> {
        Ok(Self {
            citation: Regex::new(CITATION_PATTERN)?,
        })
    }

    pub fn validate(&self, raw: &str) -> ValidatedAnswer {
        if self.citation.is_match(raw) {
            return ValidatedAnswer {
                text: raw.to_string(),
                outcome: AnswerOutcome::Grounded,
            };
        }

        ValidatedAnswer {
            text: BLOCKED_MESSAGE.to_string(),
            outcome: AnswerOutcome::Blocked,
        }
    }

    /// Distinct source numbers cited in `text`, ascending.
    pub fn cited_sources(&self, text: &str) -> Vec<usize> {
        self.citation
            .captures_iter(text)
            .filter_map(|capture| capture.get(1)?.as_str().parse::<usize>().ok())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cited numbers that do not name one of the `source_count` supplied sources.
    pub fn out_of_range_citations(&self, text: &str, source_count: usize) -> Vec<usize> {
        self.cited_sources(text)
            .into_iter()
            .filter(|number| *number == 0 || *number > source_count)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> GroundingValidator {
        GroundingValidator::new().expect("citation pattern compiles")
    }

    #[test]
    fn cited_answer_passes_unchanged() {
        let raw = "1. ATP is the energy currency of the cell [Source 2].";
        let validated = validator().validate(raw);
        assert_eq!(validated.text, raw);
        assert_eq!(validated.outcome, AnswerOutcome::Grounded);
    }

    #[test]
    fn uncited_answer_is_replaced_by_block_message() {
        for raw in [
            "ATP is the energy currency of the cell.",
            "See Source 1 for details.",
            "[Source one] says so.",
            "[Source1] without a space.",
            "",
        ] {
            let validated = validator().validate(raw);
            assert_eq!(validated.text, BLOCKED_MESSAGE, "{raw}");
            assert_eq!(validated.outcome, AnswerOutcome::Blocked);
        }
    }

    #[test]
    fn marker_allows_any_whitespace_before_number() {
        let validated = validator().validate("Claim [Source\t12].");
        assert_eq!(validated.outcome, AnswerOutcome::Grounded);
    }

    #[test]
    fn bare_refusal_is_blocked() {
        for raw in [REFUSAL_MESSAGE.to_string(), format!("  {REFUSAL_MESSAGE}\n")] {
            let validated = validator().validate(&raw);
            assert_eq!(validated.text, BLOCKED_MESSAGE);
            assert_eq!(validated.outcome, AnswerOutcome::Blocked);
        }
    }

    #[test]
    fn refusal_with_extra_prose_is_blocked() {
        let raw = format!("{REFUSAL_MESSAGE} But generally, cells need energy.");
        assert_eq!(validator().validate(&raw).outcome, AnswerOutcome::Blocked);
    }

    #[test]
    fn block_message_wording_is_fixed() {
        assert_eq!(
            BLOCKED_MESSAGE,
            "The model generated an answer without explicit source citations. This response has been blocked to maintain academic integrity."
        );
    }

    #[test]
    fn citation_diagnostics_report_numbers() {
        let text = "A [Source 2]. B [Source 5]. C [Source 2]. D [Source 0].";
        assert_eq!(validator().cited_sources(text), vec![0, 2, 5]);
        assert_eq!(validator().out_of_range_citations(text, 2), vec![0, 5]);
    }
}
