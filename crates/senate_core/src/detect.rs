use crate::schema::VoteSummary;

/// Reads a vote number the way the site's numbers have always been read:
/// surrounding whitespace is ignored, an optional sign and the leading run of
/// digits are taken, and anything after them is ignored ("00042" -> 42).
pub fn parse_vote_number(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Reads a freshly harvested vote number, which must be a whole integer
/// ("00042" -> 42, "12abc" -> none).
pub fn parse_candidate_number(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Highest vote number among already-persisted summaries. `None` when there
/// are none, or when any stored number does not parse: a corrupt baseline
/// admits nothing.
pub fn max_vote_number(existing: &[VoteSummary]) -> Option<i64> {
    let mut highest: Option<i64> = None;
    for summary in existing {
        let n = parse_vote_number(&summary.vote_number)?;
        highest = Some(highest.map_or(n, |h| h.max(n)));
    }
    highest
}

/// Keeps only the candidates newer than everything already stored for the
/// session. With no baseline every candidate is new.
///
/// Stored numbers are read leniently, candidates strictly; a candidate that
/// is not a whole integer is never new, and neither is anything measured
/// against a baseline holding an unreadable number.
pub fn filter_new_votes(candidates: Vec<VoteSummary>, existing: &[VoteSummary]) -> Vec<VoteSummary> {
    if existing.is_empty() {
        return candidates;
    }
    let Some(highest) = max_vote_number(existing) else {
        tracing::warn!(stored = existing.len(), "stored vote numbers unreadable; nothing counts as new");
        return Vec::new();
    };
    candidates
        .into_iter()
        .filter(|candidate| {
            parse_candidate_number(&candidate.vote_number).is_some_and(|n| n > highest)
        })
        .collect()
}
