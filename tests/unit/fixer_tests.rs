/*!
 * Tests for the common issues fixer
 */

use lookerip::subtitle::{CommonIssuesFixer, Cue, CueSequence};

fn timeline(times: &[(u64, u64)]) -> CueSequence {
    times
        .iter()
        .enumerate()
        .map(|(i, (start, end))| Cue::from_text(*start, *end, &format!("cue {}", i + 1)))
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn test_fix_withChainOfOverlaps_shouldLeaveNoOverlap() {
    let sequence = timeline(&[(0, 5000), (1000, 3000), (2000, 8000), (7000, 9000)]);

    let outcome = CommonIssuesFixer::default().fix(sequence);

    let cues = &outcome.sequence.cues;
    assert!(outcome.issues_found());
    for pair in cues.windows(2) {
        assert!(pair[0].end_time_ms <= pair[1].start_time_ms);
        assert!(pair[0].end_time_ms > pair[0].start_time_ms);
    }
    assert_eq!(cues[0].end_time_ms, cues[1].start_time_ms);
}

#[test]
fn test_fix_withOverlap_shouldClampExactlyToNextStart() {
    let outcome = CommonIssuesFixer::default().fix(timeline(&[(1000, 3000), (2500, 5000)]));

    assert_eq!(outcome.sequence.cues[0].end_time_ms, 2500);
    assert_eq!(outcome.sequence.cues[1].start_time_ms, 2500);
}

#[test]
fn test_fix_appliedTwice_shouldBeIdempotent() {
    let fixer = CommonIssuesFixer::default().with_language(Some("fr"));
    let mut sequence = timeline(&[(0, 1000), (1040, 3000), (2000, 4000), (4000, 4000)]);
    sequence.push(Cue::from_text(5000, 6000, "Quoi ?Vraiment!"));

    let first = fixer.fix(sequence);
    let second = fixer.fix(first.sequence.clone());

    assert!(first.issues_found());
    assert!(!second.issues_found());
    assert_eq!(second.sequence, first.sequence);
}

#[test]
fn test_fix_withCustomThreshold_shouldCloseWiderGaps() {
    let sequence = timeline(&[(0, 1000), (1200, 2000)]);

    let default = CommonIssuesFixer::default().fix(sequence.clone());
    let wide = CommonIssuesFixer::default().with_short_gap_threshold(250).fix(sequence);

    assert_eq!(default.sequence.cues[0].end_time_ms, 1000);
    assert_eq!(wide.sequence.cues[0].end_time_ms, 1200);
}

#[test]
fn test_fix_withEmptyAndInvertedCues_shouldDropThem() {
    let sequence = CueSequence::from(vec![
        Cue::from_text(0, 1000, "kept"),
        Cue::from_text(2000, 3000, "   "),
        Cue::from_text(5000, 4000, "inverted"),
    ]);

    let outcome = CommonIssuesFixer::default().fix(sequence);

    assert_eq!(outcome.sequence.len(), 1);
    assert_eq!(outcome.report.dropped_cues, 2);
}

#[test]
fn test_fix_withDialogueDashes_shouldNormalizeSpacing() {
    let sequence = CueSequence::from(vec![Cue::from_text(0, 1000, "-Oi.\n-   Tudo bem?")]);

    let outcome = CommonIssuesFixer::default().with_language(Some("pt-BR")).fix(sequence);

    assert_eq!(outcome.sequence.cues[0].text(), "- Oi.\n- Tudo bem?");
}

#[test]
fn test_fix_withNothingToRepair_shouldReportNoIssues() {
    let outcome = CommonIssuesFixer::default().fix(timeline(&[(0, 1000), (2000, 3000)]));

    assert!(!outcome.issues_found());
    assert_eq!(outcome.report.total(), 0);
}
