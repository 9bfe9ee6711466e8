//! Text shaping for fixed-width device cells

/// Replace everything outside printable ASCII.
///
/// Common Latin-1 letters are transliterated, anything else becomes `?`.
pub fn fix_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'Ä' => out.push_str("Ae"),
            'ö' => out.push_str("oe"),
            'Ö' => out.push_str("Oe"),
            'ü' => out.push_str("ue"),
            'Ü' => out.push_str("Ue"),
            'ß' => out.push_str("ss"),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'á' | 'à' | 'â' | 'å' => out.push('a'),
            'Á' | 'À' | 'Â' | 'Å' => out.push('A'),
            'í' | 'ì' | 'î' | 'ï' => out.push('i'),
            'ó' | 'ò' | 'ô' => out.push('o'),
            'ú' | 'ù' | 'û' => out.push('u'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ñ' => out.push('n'),
            'Ñ' => out.push('N'),
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Pad or truncate `text` to exactly `length` characters.
///
/// Truncation keeps the left-most characters; padding appends spaces.
pub fn pad(text: &str, length: usize) -> String {
    let mut out: String = text.chars().take(length).collect();
    let count = out.chars().count();
    out.extend(std::iter::repeat(' ').take(length - count));
    out
}

/// Split a block's text across its two cells of `cell_width` characters.
///
/// The first cell gets the first `cell_width` characters verbatim, the second
/// gets the remainder padded. Text longer than both cells is truncated.
pub fn split_block(text: &str, cell_width: usize) -> (String, String) {
    if text.chars().count() > cell_width {
        let first: String = text.chars().take(cell_width).collect();
        let rest: String = text.chars().skip(cell_width).collect();
        (first, pad(&rest, cell_width))
    } else {
        (pad(text, cell_width), pad("", cell_width))
    }
}
