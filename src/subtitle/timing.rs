/*!
 * Timestamp helpers for the common millisecond timeline.
 *
 * Every decoder converts its native notation into milliseconds through these
 * functions, and the SRT serializer formats them back.
 */

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format milliseconds as a WebVTT timestamp (HH:MM:SS.mmm)
pub fn format_webvtt(ms: u64) -> String {
    format_srt(ms).replace(',', ".")
}

/// Assemble a clock time, rejecting out-of-range minutes or seconds
pub fn clock_to_ms(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<u64> {
    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return None;
    }
    hours
        .checked_mul(3_600_000)?
        .checked_add(minutes * 60_000 + seconds * 1_000 + millis)
}

/// Convert a decimal fraction ("5", "25", "125", "1234") to milliseconds.
///
/// Digits beyond the third are truncated.
pub fn fraction_to_ms(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded: String = digits.chars().take(3).collect();
    while padded.len() < 3 {
        padded.push('0');
    }
    padded.parse().ok()
}

/// Convert seconds expressed as a float to rounded milliseconds.
///
/// Negative, non-finite and out of range values give `None`.
pub fn seconds_to_ms(seconds: f64) -> Option<u64> {
    let ms = (seconds * 1000.0).round();
    // u64::MAX as f64 rounds up to 2^64, which is itself out of range
    if !ms.is_finite() || ms < 0.0 || ms >= u64::MAX as f64 {
        return None;
    }
    Some(ms as u64)
}

/// Convert media ticks at a given timescale to milliseconds, `None` past `u64::MAX`
pub fn ticks_to_ms(ticks: u64, timescale: u32) -> Option<u64> {
    if timescale == 0 {
        return Some(ticks);
    }
    u64::try_from(u128::from(ticks) * 1000 / u128::from(timescale)).ok()
}
