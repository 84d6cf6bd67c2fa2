//! Caption cue timing derived from narration scripts.
//!
//! There is no forced alignment step. Cue durations come from a flat
//! speaking-rate model (characters per second) applied to each
//! narration unit, laid out contiguously from zero.

use shorts_models::{CaptionCue, Script};

/// Builds caption cues for a script.
///
/// Units are the hook, the transition, each summary sentence, the
/// background note and the ending, in spoken order. Empty units are
/// skipped without leaving a timing gap.
pub fn build_caption_cues(script: &Script, chars_per_second: f64) -> Vec<CaptionCue> {
    let mut units: Vec<String> = Vec::new();
    units.push(script.hook.clone());
    units.push(script.transition.clone());
    units.extend(split_sentences(&script.summary));
    units.push(script.background.clone());
    units.push(script.ending.clone());

    let mut cues = Vec::new();
    let mut cursor_ms = 0u64;
    for unit in units {
        let text = unit.trim();
        if text.is_empty() {
            continue;
        }
        let duration_ms = (text.chars().count() as f64 / chars_per_second * 1000.0).round() as u64;
        let end_ms = cursor_ms + duration_ms;
        cues.push(CaptionCue::new(cursor_ms, end_ms, text));
        cursor_ms = end_ms;
    }
    cues
}

/// Splits summary text into sentences on ". " boundaries, restoring
/// the period the split removes.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(". ")
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let s = s.trim();
            if s.ends_with('.') || s.ends_with('!') || s.ends_with('?') {
                s.to_string()
            } else {
                format!("{s}.")
            }
        })
        .collect()
}

/// Formats cues as an SRT document.
pub fn format_srt(cues: &[CaptionCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(cue.start_ms),
            format_timestamp(cue.end_ms),
            cue.text
        ));
    }
    out
}

fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn script(hook: &str, transition: &str, summary: &str, background: &str, ending: &str) -> Script {
        Script {
            video_id: "vid1".to_string(),
            title: "t".to_string(),
            channel: "c".to_string(),
            hook: hook.to_string(),
            transition: transition.to_string(),
            summary: summary.to_string(),
            background: background.to_string(),
            ending: ending.to_string(),
            created_at: Utc::now(),
            youtube_title: None,
            youtube_tags: Vec::new(),
        }
    }

    #[test]
    fn test_cues_are_contiguous_from_zero() {
        let s = script("12345678", "1234", "abcd. efgh", "12345678", "1234");
        let cues = build_caption_cues(&s, 4.0);

        assert_eq!(cues[0].start_ms, 0);
        for pair in cues.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
    }

    #[test]
    fn test_duration_follows_speaking_rate() {
        let s = script("12345678", "", "", "", "");
        let cues = build_caption_cues(&s, 4.0);
        assert_eq!(cues.len(), 1);
        // 8 chars at 4 chars/sec
        assert_eq!(cues[0].duration_ms(), 2000);
    }

    #[test]
    fn test_summary_splits_into_sentences() {
        let s = script("h", "t", "First point. Second point.", "b", "e");
        let cues = build_caption_cues(&s, 4.0);
        let texts: Vec<&str> = cues.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"First point."));
        assert!(texts.contains(&"Second point."));
    }

    #[test]
    fn test_empty_units_leave_no_gap() {
        let s = script("hook", "", "summary", "", "end");
        let cues = build_caption_cues(&s, 4.0);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].end_ms, cues[1].start_ms);
    }

    #[test]
    fn test_srt_formatting() {
        let cues = vec![
            CaptionCue::new(0, 1500, "Hello"),
            CaptionCue::new(1500, 63_250, "World"),
        ];
        let srt = format_srt(&cues);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:01,500\nHello\n"));
        assert!(srt.contains("2\n00:00:01,500 --> 00:01:03,250\nWorld\n"));
    }
}
