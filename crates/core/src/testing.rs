//! Generators for the revision engine's property tests.

use quickcheck::{Arbitrary, Gen};

/// Chars the patch engine pads hunk context with.
const PADDING: [char; 4] = ['\u{1}', '\u{2}', '\u{3}', '\u{4}'];

/// A small alphabet so generated texts share runs worth diffing.
const COMMON: [char; 8] = ['a', 'b', ' ', '\n', '.', 'é', '字', '🦀'];

/// Page text mixing arbitrary Unicode scalars, padding chars, and a small
/// alphabet of common chars.
#[derive(Debug, Clone)]
pub(crate) struct PageText(pub String);

impl Arbitrary for PageText {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % (g.size() + 1);
        let text = (0..len)
            .map(|_| match u8::arbitrary(g) % 4 {
                0 => char::arbitrary(g),
                1 => *g.choose(&PADDING).unwrap(),
                _ => *g.choose(&COMMON).unwrap(),
            })
            .collect();
        PageText(text)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(PageText))
    }
}

/// Replace the chars of `text` in `start..end` (char offsets, clamped) with
/// `insert`.
pub(crate) fn splice(text: &str, start: usize, end: usize, insert: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = start.min(chars.len());
    let end = end.clamp(start, chars.len());
    let mut out: String = chars[..start].iter().collect();
    out.push_str(insert);
    out.extend(&chars[end..]);
    out
}
