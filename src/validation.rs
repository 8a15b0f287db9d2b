//! Input validation and sanitization for outbound mail.
//!
//! All functions here are pure and total: malformed input yields a cleaned
//! value or a `false`, never an error.

/// Maximum subject length after sanitization (RFC 5322 line length limit).
pub const MAX_SUBJECT_LENGTH: usize = 998;

/// Syntactic email address check.
///
/// Requires a non-empty local part and domain separated by `@`, a `.` in the
/// domain, and no whitespace anywhere. This is a deliberately light
/// heuristic, not an RFC 5322 grammar; exotic-but-valid addresses may be
/// rejected and some invalid ones accepted.
pub fn is_valid_email(address: &str) -> bool {
    if address.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    // Domain needs a dot with something on both sides.
    match domain.split_once('.') {
        Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
        None => false,
    }
}

/// Sanitize a subject line for use in a mail header.
///
/// Strips CR/LF (header-injection defense), collapses whitespace runs to
/// single spaces, trims, and truncates to [`MAX_SUBJECT_LENGTH`] characters.
pub fn sanitize_subject(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    let mut last_was_space = true; // leading whitespace is dropped

    for ch in subject.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }

    while out.ends_with(' ') {
        out.pop();
    }

    // Truncation can expose a trailing space; trim again so the function
    // stays idempotent.
    let truncated: String = out.chars().take(MAX_SUBJECT_LENGTH).collect();
    truncated.trim_end().to_string()
}

/// Normalize a message body.
///
/// Converts `\r\n` and bare `\r` line endings to `\n` and trims leading and
/// trailing whitespace. The body has no length cap.
pub fn sanitize_body(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
