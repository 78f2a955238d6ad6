//! Session code alphabet and normalization.
//!
//! Session codes are six characters drawn from `[A-Z0-9]`, giving a space of
//! 36^6 (about 2.18 billion) codes. Generation lives server-side; this module
//! only defines the shape so clients and servers agree on it.

/// Length of a session code.
pub const CODE_LEN: usize = 6;

/// Characters a session code may contain.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Returns true if `code` is exactly [`CODE_LEN`] characters of [`CODE_ALPHABET`].
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Normalize user-typed input into a session code.
///
/// Surrounding whitespace is dropped and letters are upper-cased. Returns
/// `None` when the result is not a well-formed code.
///
/// ```rust
/// use stormer_proto::normalize_code;
///
/// assert_eq!(normalize_code(" ab12cd "), Some("AB12CD".to_string()));
/// assert_eq!(normalize_code("AB12C"), None);
/// ```
pub fn normalize_code(input: &str) -> Option<String> {
    let code = input.trim().to_ascii_uppercase();
    is_valid_code(&code).then_some(code)
}
