/// Used when nothing usable survives sanitization.
pub const FALLBACK_NAME: &str = "downloaded_playlist";

const MAX_LEN: usize = 80;

/// Filesystem-safe folder name: ASCII letters, digits, `-`, `_` and `.` only.
/// Runs of anything else (whitespace included) collapse into one `_`.
pub fn sanitize_name(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.trim().chars() {
        let mapped = if is_allowed(c) { c } else { '_' };
        if mapped == '_' {
            if !prev_underscore {
                cleaned.push('_');
            }
            prev_underscore = true;
        } else {
            cleaned.push(mapped);
            prev_underscore = false;
        }
    }

    let mut name = cleaned.trim_matches(&['_', '.'][..]).to_string();
    if name.len() > MAX_LEN {
        name.truncate(MAX_LEN);
        name = name.trim_end_matches(&['_', '.'][..]).to_string();
    }
    if name.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
