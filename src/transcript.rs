use std::path::Path;

use crate::error::DialogueError;

/// One spoken line of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    /// 1-based line number in the source file.
    pub line_no: usize,
    pub speaker: String,
    pub text: String,
}

/// Parse a single `Speaker: text` line.
///
/// Splits at the first colon and trims both halves. Returns `None` for
/// blank lines, lines without a colon, and lines with an empty speaker or
/// empty text.
pub fn parse_line(line_no: usize, raw: &str) -> Option<TranscriptLine> {
    let (speaker, text) = raw.trim().split_once(':')?;
    let speaker = speaker.trim();
    let text = text.trim();
    if speaker.is_empty() || text.is_empty() {
        return None;
    }
    Some(TranscriptLine {
        line_no,
        speaker: speaker.to_string(),
        text: text.to_string(),
    })
}

/// Parse a whole transcript, keeping only lines that carry dialogue.
pub fn parse_transcript(content: &str) -> Vec<TranscriptLine> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let parsed = parse_line(idx + 1, raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                log::debug!("Skipping line {}: not a `Speaker: text` line", idx + 1);
            }
            parsed
        })
        .collect()
}

/// Read and parse a UTF-8 transcript file.
pub fn read_transcript(path: &Path) -> Result<Vec<TranscriptLine>, DialogueError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_transcript(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_speaker_and_text() {
        let line = parse_line(3, "  Alice :  Hello there.  ").expect("line");
        assert_eq!(line.line_no, 3);
        assert_eq!(line.speaker, "Alice");
        assert_eq!(line.text, "Hello there.");
    }

    #[test]
    fn splits_only_at_first_colon() {
        let line = parse_line(1, "Bob: Meet me at 10:30: sharp").expect("line");
        assert_eq!(line.speaker, "Bob");
        assert_eq!(line.text, "Meet me at 10:30: sharp");
    }

    #[test]
    fn skips_lines_without_dialogue() {
        assert_eq!(parse_line(1, ""), None);
        assert_eq!(parse_line(1, "   "), None);
        assert_eq!(parse_line(1, "no colon here"), None);
        assert_eq!(parse_line(1, "Alice:"), None);
        assert_eq!(parse_line(1, "Alice:    "), None);
        assert_eq!(parse_line(1, ": orphan text"), None);
    }

    #[test]
    fn transcript_keeps_order_and_line_numbers() {
        let lines = parse_transcript("Alice: Hello there.\n\nnarration\nBob: Hi!\nCarol:\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, "Alice");
        assert_eq!(lines[0].line_no, 1);
        assert_eq!(lines[1].speaker, "Bob");
        assert_eq!(lines[1].text, "Hi!");
        assert_eq!(lines[1].line_no, 4);
    }

    #[test]
    fn handles_crlf_and_unicode() {
        let lines = parse_transcript("Zoë: Ça va ?\r\nJosé: ¡Sí!\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Ça va ?");
        assert_eq!(lines[1].speaker, "José");
    }
}
