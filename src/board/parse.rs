//! Block text → ordered sound specs.
//!
//! The grammar has no separators: an entry starts at `name:` and runs until the
//! next `name:` or the end of the text. Inside an entry, each recognised key
//! owns the text up to the next recognised key. Parsing never fails; entries
//! without a name and a url are dropped and reported.

use super::SoundSpec;

/// Keys understood inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Url,
    Image,
    Loop,
    Volume,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::Name,
        Field::Url,
        Field::Image,
        Field::Loop,
        Field::Volume,
    ];

    fn keyword(self) -> &'static str {
        match self {
            Field::Name => "name:",
            Field::Url => "url:",
            Field::Image => "image:",
            Field::Loop => "loop:",
            Field::Volume => "volume:",
        }
    }
}

/// A key and the trimmed text it owns
#[derive(Debug, Clone, Copy, PartialEq)]
struct Token<'a> {
    field: Field,
    value: &'a str,
}

/// Why an entry was left out of the parse result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No `name:` key, or an empty name
    MissingName,
    /// No `url:` key, or an empty url
    MissingUrl,
}

/// An entry dropped by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position of the entry in the text, counting dropped entries too
    pub index: usize,
    pub reason: SkipReason,
}

/// Parse result including the entries that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub sounds: Vec<SoundSpec>,
    pub skipped: Vec<SkippedEntry>,
}

/// Parse block text into sound specs, in order of appearance.
pub fn parse(text: &str) -> Vec<SoundSpec> {
    parse_with_report(text).sounds
}

/// Parse block text, keeping track of dropped entries.
pub fn parse_with_report(text: &str) -> ParseReport {
    let mut report = ParseReport::default();
    let mut entry: Option<EntryFields<'_>> = None;
    let mut index = 0;

    for token in tokenize(text) {
        if token.field == Field::Name {
            if let Some(done) = entry.take() {
                done.finish(index, &mut report);
                index += 1;
            }
            entry = Some(EntryFields::default());
        }
        entry.get_or_insert_with(EntryFields::default).set(token);
    }
    if let Some(done) = entry {
        done.finish(index, &mut report);
    }

    report
}

/// Split text into key/value tokens.
///
/// A key only counts at the start of the text or right after whitespace, so
/// `https://host/?name:x` stays part of a url.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    // (field, key start, value start)
    let mut marks: Vec<(Field, usize, usize)> = Vec::new();
    let mut prev: Option<char> = None;

    for (idx, ch) in text.char_indices() {
        let at_boundary = prev.map_or(true, char::is_whitespace);
        prev = Some(ch);
        if !at_boundary {
            continue;
        }
        let rest = &text[idx..];
        if let Some(field) = Field::ALL
            .iter()
            .copied()
            .find(|f| rest.starts_with(f.keyword()))
        {
            marks.push((field, idx, idx + field.keyword().len()));
        }
    }

    marks
        .iter()
        .enumerate()
        .map(|(i, &(field, _, value_start))| {
            let value_end = marks.get(i + 1).map_or(text.len(), |next| next.1);
            Token {
                field,
                value: text[value_start..value_end].trim(),
            }
        })
        .collect()
}

/// Raw fields of one entry; later keys override earlier ones.
#[derive(Debug, Default)]
struct EntryFields<'a> {
    name: Option<&'a str>,
    url: Option<&'a str>,
    image: Option<&'a str>,
    looping: Option<&'a str>,
    volume: Option<&'a str>,
}

impl<'a> EntryFields<'a> {
    fn set(&mut self, token: Token<'a>) {
        let slot = match token.field {
            Field::Name => &mut self.name,
            Field::Url => &mut self.url,
            Field::Image => &mut self.image,
            Field::Loop => &mut self.looping,
            Field::Volume => &mut self.volume,
        };
        *slot = Some(token.value);
    }

    fn finish(self, index: usize, report: &mut ParseReport) {
        let name = match self.name.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => return skip(index, SkipReason::MissingName, report),
        };
        let url = match self.url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => return skip(index, SkipReason::MissingUrl, report),
        };

        let mut spec = SoundSpec::new(name, url);
        spec.image_ref = self.image.filter(|i| !i.is_empty()).map(str::to_owned);
        spec.looping = self
            .looping
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        if let Some(raw) = self.volume {
            match parse_volume(raw) {
                Some(volume) => spec.volume = volume,
                None => tracing::debug!(entry = index, value = raw, "ignoring malformed volume"),
            }
        }
        report.sounds.push(spec);
    }
}

fn skip(index: usize, reason: SkipReason, report: &mut ParseReport) {
    tracing::debug!(entry = index, ?reason, "skipping soundboard entry");
    report.skipped.push(SkippedEntry { index, reason });
}

/// `50`, `50%` and `50.0 %` all give 0.5. Out-of-range values are clamped.
fn parse_volume(raw: &str) -> Option<f32> {
    let digits = raw.strip_suffix('%').unwrap_or(raw).trim();
    let percent: f32 = digits.parse().ok()?;
    if !percent.is_finite() {
        return None;
    }
    Some(percent.clamp(0.0, 100.0) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_twice_gives_equal_results() {
        let text = "name: A url: a.mp3 loop: true\nname: B url: [[b.ogg]] volume: 20%";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn keeps_textual_order() {
        let sounds = parse("name: A url: a\nname: B url: b\nname: C url: c");
        let names: Vec<_> = sounds.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn minimal_entry_gets_defaults() {
        let sounds = parse("name: X url: Y");
        assert_eq!(sounds, vec![SoundSpec::new("X", "Y")]);
        assert_eq!(sounds[0].image_ref, None);
        assert!(!sounds[0].looping);
        assert_eq!(sounds[0].volume, 1.0);
    }

    #[test]
    fn volume_with_and_without_percent() {
        let with = parse("name: X url: Y volume: 50%");
        let without = parse("name: X url: Y volume: 50");
        assert_eq!(with[0].volume, 0.5);
        assert_eq!(without[0].volume, 0.5);
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(parse("name: X url: Y volume: 250%")[0].volume, 1.0);
        assert_eq!(parse("name: X url: Y volume: -20")[0].volume, 0.0);
    }

    #[test]
    fn malformed_volume_keeps_default() {
        assert_eq!(parse("name: X url: Y volume: loud")[0].volume, 1.0);
        assert_eq!(parse("name: X url: Y volume: NaN")[0].volume, 1.0);
    }

    #[test]
    fn all_fields_multiline() {
        let text = "
            name: Thunder Clap
            url: [[sfx/thunder.mp3]]
            image: [[img/storm.png]]
            loop: true
            volume: 75%
        ";
        let sounds = parse(text);
        assert_eq!(
            sounds,
            vec![SoundSpec::new("Thunder Clap", "[[sfx/thunder.mp3]]")
                .with_image("[[img/storm.png]]")
                .with_loop(true)
                .with_volume(0.75)]
        );
    }

    #[test]
    fn fields_in_any_order() {
        let sounds = parse("name: X volume: 10 loop: TRUE image: pic.png url: clip.wav");
        assert_eq!(
            sounds,
            vec![SoundSpec::new("X", "clip.wav")
                .with_image("pic.png")
                .with_loop(true)
                .with_volume(0.1)]
        );
    }

    #[test]
    fn entries_without_url_are_skipped() {
        let report = parse_with_report("name: A url: a\nname: B image: b.png\nname: C url: c");
        let names: Vec<_> = report.sounds.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
        assert_eq!(
            report.skipped,
            vec![SkippedEntry {
                index: 1,
                reason: SkipReason::MissingUrl
            }]
        );
    }

    #[test]
    fn empty_name_is_skipped() {
        let report = parse_with_report("name:    url: a.mp3");
        assert!(report.sounds.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::MissingName);
    }

    #[test]
    fn fields_before_first_name_are_dropped() {
        let report = parse_with_report("url: orphan.mp3\nname: A url: a.mp3");
        assert_eq!(report.sounds, vec![SoundSpec::new("A", "a.mp3")]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingName);
    }

    #[test]
    fn leading_text_is_ignored() {
        let sounds = parse("my sounds for session 4\nname: A url: a.mp3");
        assert_eq!(sounds, vec![SoundSpec::new("A", "a.mp3")]);
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        let sounds = parse("name: A url: https://cdn.example/get?name:a&curl:b");
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].audio_ref, "https://cdn.example/get?name:a&curl:b");
    }

    #[test]
    fn unknown_keys_stay_in_the_previous_value() {
        let sounds = parse("name: A url: a.mp3 color: red");
        assert_eq!(sounds[0].audio_ref, "a.mp3 color: red");
    }

    #[test]
    fn later_duplicate_field_wins() {
        let sounds = parse("name: A url: first.mp3 url: second.mp3");
        assert_eq!(sounds[0].audio_ref, "second.mp3");
    }

    #[test]
    fn duplicate_names_are_both_kept() {
        let sounds = parse("name: Door url: a.mp3 name: Door url: b.mp3");
        assert_eq!(sounds.len(), 2);
        assert_ne!(sounds[0], sounds[1]);
    }

    #[test]
    fn loop_only_true_enables_looping() {
        assert!(!parse("name: X url: Y loop: false")[0].looping);
        assert!(!parse("name: X url: Y loop: yes")[0].looping);
        assert!(parse("name: X url: Y loop: True")[0].looping);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_with_report(""), ParseReport::default());
        assert_eq!(parse_with_report("   \n\t"), ParseReport::default());
    }

    #[test]
    fn tokenizer_handles_multibyte_text() {
        let sounds = parse("name: Tonnerre ⚡ url: [[sons/éclair.mp3]]");
        assert_eq!(sounds[0].name, "Tonnerre ⚡");
        assert_eq!(sounds[0].audio_ref, "[[sons/éclair.mp3]]");
    }
}
