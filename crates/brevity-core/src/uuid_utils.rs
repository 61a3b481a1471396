//! UUID v7 utilities for time-ordered identifiers.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// UUIDv7 embeds a Unix timestamp (milliseconds) in the first 48 bits, so
/// identifiers sort in creation order.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Parse an identifier supplied by a caller.
///
/// Returns `None` for anything that is not a well-formed UUID so callers can
/// report it exactly like a missing record.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_version_7() {
        assert_eq!(new_v7().get_version_num(), 7);
    }

    #[test]
    fn test_new_v7_ordering() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(b > a);
    }

    #[test]
    fn test_parse_id() {
        let id = new_v7();
        assert_eq!(parse_id(&id.to_string()), Some(id));
        assert_eq!(parse_id("1"), None);
        assert_eq!(parse_id(""), None);
    }
}
