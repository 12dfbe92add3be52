//! JSON-Pointer (RFC 6901) escaping used to embed a Swagger path key inside
//! an operation reference's pointer, e.g. `/providers/{fooName}` becomes
//! `/paths/~1providers~1{fooName}`.

/// Escapes `~` and `/` per RFC 6901 so `raw` can be used as one reference token.
pub fn escape(raw: &str) -> String {
    raw.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape`].
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Splits a pointer string (`/a/b/0`) into its unescaped reference tokens.
pub fn tokens(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return vec![];
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(unescape)
        .collect()
}
