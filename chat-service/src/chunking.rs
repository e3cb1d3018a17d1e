//! Splits long answers into pieces the translation and speech endpoints accept.

/// Characters after which a piece may end, best first.
const SENTENCE_ENDS: &[char] = &['.', '!', '?', '\n', '।', '。', '؟'];
const CLAUSE_ENDS: &[char] = &[',', ';', ':', '،', '、'];

/// Splits `text` into trimmed, non-empty pieces of at most `max` characters,
/// preferring sentence ends, then clause ends, then whitespace.
pub fn split_text(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut pieces = Vec::new();
    let mut rest: Vec<char> = text.trim().chars().collect();

    while rest.len() > max {
        let window = &rest[..max];
        let cut = last_boundary(window, SENTENCE_ENDS)
            .or_else(|| last_boundary(window, CLAUSE_ENDS))
            .or_else(|| last_boundary_by(window, char::is_whitespace))
            .unwrap_or(max);

        push_piece(&mut pieces, &rest[..cut]);
        rest = rest[cut..].to_vec();
    }
    push_piece(&mut pieces, &rest);
    pieces
}

fn last_boundary(window: &[char], ends: &[char]) -> Option<usize> {
    last_boundary_by(window, |c| ends.contains(&c))
}

/// Index just past the last matching character, ignoring a match at position 0.
fn last_boundary_by(window: &[char], matches: impl Fn(char) -> bool) -> Option<usize> {
    window
        .iter()
        .rposition(|&c| matches(c))
        .filter(|&i| i > 0)
        .map(|i| i + 1)
}

fn push_piece(pieces: &mut Vec<String>, chars: &[char]) {
    let piece: String = chars.iter().collect();
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}
