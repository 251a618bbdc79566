use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Maximum excerpt length (in characters) shown for a post in the feed.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// Calculates the display width of a string in terminal columns.
///
/// CJK characters and most emoji occupy two columns, combining marks zero.
///
/// ```
/// use devlog::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("你好"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to fit within `max_width` terminal columns, appending
/// `"..."` when text was cut.
///
/// Widths of 3 or less return as many characters as fit, without ellipsis.
/// Returns `Cow::Borrowed` whenever the input already fits.
///
/// ```
/// use devlog::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if max_width <= ELLIPSIS_WIDTH {
        let mut byte_end = 0;
        let mut current_width = 0;
        for (idx, c) in s.char_indices() {
            let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
            if current_width + char_width > max_width {
                break;
            }
            current_width += char_width;
            byte_end = idx + c.len_utf8();
        }
        if byte_end == s.len() {
            return Cow::Borrowed(s);
        }
        return Cow::Owned(s[..byte_end].to_string());
    }
    let target_width = max_width.saturating_sub(ELLIPSIS_WIDTH);

    let mut current_width = 0;
    let mut cut_point = None;
    let mut exceeded_max = false;

    for (idx, c) in s.char_indices() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);

        if cut_point.is_none() && current_width + char_width > target_width {
            cut_point = Some(idx);
        }

        if current_width + char_width > max_width {
            exceeded_max = true;
            break;
        }

        current_width += char_width;
    }

    if exceeded_max {
        let cut = cut_point.unwrap_or(s.len());
        Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
    } else {
        Cow::Borrowed(s)
    }
}

/// Strip terminal control characters and ANSI escape sequences from text.
///
/// Post titles and bodies are user-authored and rendered straight into the
/// terminal, so CSI/OSC sequences, bare ESC, DEL and C0 controls are removed.
/// Tab, newline and carriage return are kept.
///
/// Returns `Cow::Borrowed` when the input is already clean.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let len = bytes.len();

    let is_control =
        |b: u8| b == 0x1b || b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d);

    if !bytes.iter().any(|&b| is_control(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];

        if b == 0x1b {
            if i + 1 < len && bytes[i + 1] == b'[' {
                // CSI: parameters until a final byte in 0x40..=0x7e
                i += 2;
                while i < len {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            } else if i + 1 < len && bytes[i + 1] == b']' {
                // OSC: until BEL or ST
                i += 2;
                while i < len {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && i + 1 < len && bytes[i + 1] == b'\\' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            } else {
                i += 1;
            }
        } else if is_control(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && !is_control(bytes[i]) {
                i += 1;
            }
            // ASCII control bytes never occur inside a multi-byte sequence.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

/// Build the feed excerpt for a post body.
///
/// Whitespace runs (including newlines) collapse to single spaces. Bodies
/// longer than `max_chars` are cut; when the last space inside the cut lies
/// beyond 80% of the limit the cut moves back to that space, so words are
/// not split unless the only break is very early. `"..."` marks a cut.
///
/// ```
/// use devlog::util::excerpt;
///
/// assert_eq!(excerpt("short body", 200), "short body");
/// assert_eq!(excerpt("aaaa bbbb cccc", 10), "aaaa bbbb...");
/// ```
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_chars).collect();
    let threshold = max_chars as f64 * 0.8;
    let kept = match cut.rfind(' ') {
        Some(byte_idx) if cut[..byte_idx].chars().count() as f64 > threshold => &cut[..byte_idx],
        _ => cut.as_str(),
    };
    format!("{}{}", kept, ELLIPSIS)
}

/// Avatar initial for a name: its first character uppercased, `'U'` when the
/// name is absent or blank.
pub fn initial(name: Option<&str>) -> char {
    name.and_then(|n| n.trim().chars().next())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('U')
}

/// The part of an email address before `@`.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
