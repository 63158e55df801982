use crate::measure::TextMeasure;

/// Break `text` into lines no wider than `max_width`.
///
/// Lines break at whitespace; a single token wider than `max_width` is split
/// between characters. Explicit newlines are kept. Every line holds at least
/// one character, so a column narrower than one glyph still terminates.
/// Empty input yields one empty line.
pub fn wrap(text: &str, max_width: f32, measure: &impl TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph, max_width, measure, &mut lines);
    }
    lines
}

fn wrap_paragraph(text: &str, max_width: f32, measure: &impl TextMeasure, out: &mut Vec<String>) {
    let mut line = String::new();
    let start = out.len();

    for word in text.split_whitespace() {
        if line.is_empty() {
            place_word(word, max_width, measure, &mut line, out);
            continue;
        }

        let candidate = format!("{line} {word}");
        if measure.width(&candidate) <= max_width {
            line = candidate;
        } else {
            out.push(std::mem::take(&mut line));
            place_word(word, max_width, measure, &mut line, out);
        }
    }

    if !line.is_empty() || out.len() == start {
        out.push(line);
    }
}

/// Put `word` at the start of an empty `line`, emitting full lines for any
/// part that does not fit.
fn place_word(
    word: &str,
    max_width: f32,
    measure: &impl TextMeasure,
    line: &mut String,
    out: &mut Vec<String>,
) {
    if measure.width(word) <= max_width {
        line.push_str(word);
        return;
    }

    for ch in word.chars() {
        line.push(ch);
        if line.chars().count() > 1 && measure.width(line) > max_width {
            line.pop();
            out.push(std::mem::take(line));
            line.push(ch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasure;
    use proptest::prelude::*;

    fn mono() -> MonospaceMeasure {
        MonospaceMeasure::new(1.0, 10.0)
    }

    #[test]
    fn breaks_at_word_boundaries() {
        assert_eq!(
            wrap("taxi from airport to site", 10.0, &mono()),
            ["taxi from", "airport to", "site"]
        );
    }

    #[test]
    fn long_token_is_split_by_character() {
        assert_eq!(
            wrap("go INV-2026-000123 now", 6.0, &mono()),
            ["go", "INV-20", "26-000", "123", "now"]
        );
    }

    #[test]
    fn tail_of_split_token_shares_a_line() {
        assert_eq!(wrap("abcdefgh ij", 6.0, &mono()), ["abcdef", "gh ij"]);
    }

    #[test]
    fn empty_and_blank_text_keep_one_line() {
        assert_eq!(wrap("", 10.0, &mono()), [""]);
        assert_eq!(wrap("   ", 10.0, &mono()), [""]);
    }

    #[test]
    fn newlines_are_preserved() {
        assert_eq!(wrap("a\n\nb", 10.0, &mono()), ["a", "", "b"]);
    }

    #[test]
    fn narrower_than_a_glyph_still_progresses() {
        assert_eq!(wrap("abc", 0.5, &mono()), ["a", "b", "c"]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        assert_eq!(wrap("ค่าแท็กซี่", 4.0, &mono()).concat(), "ค่าแท็กซี่");
    }

    proptest! {
        #[test]
        fn lines_fit_and_words_survive(
            words in proptest::collection::vec("[a-z]{1,15}", 0..20),
            width in 1u8..30,
        ) {
            let text = words.join(" ");
            let width = f32::from(width);
            let lines = wrap(&text, width, &mono());

            for line in &lines {
                prop_assert!(line.chars().count() == 1 || line.chars().count() as f32 <= width);
            }
            let rejoined: String = lines.concat().chars().filter(|c| !c.is_whitespace()).collect();
            let original: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            prop_assert_eq!(rejoined, original);
        }
    }
}
