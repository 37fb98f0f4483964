//! Cache Keys Module
//!
//! Canonical key builders, one family per prefix. Every family can be
//! dropped wholesale with `invalidate("<prefix>:*")`.

/// Prefix for user profile keys.
pub const USER_PREFIX: &str = "user";
/// Prefix for club metadata keys.
pub const CLUB_PREFIX: &str = "club";
/// Prefix for single member keys.
pub const MEMBER_PREFIX: &str = "member";
/// Prefix for per-club member list keys.
pub const MEMBERS_BY_CLUB_PREFIX: &str = "members:club";
/// Prefix for user role keys.
pub const ROLE_PREFIX: &str = "role";
/// Prefix for API response keys.
pub const API_PREFIX: &str = "api";
/// Prefix for paginator page keys.
pub const PAGE_PREFIX: &str = "page";

pub fn user(uid: &str) -> String {
    format!("{}:{}", USER_PREFIX, uid)
}

pub fn club(club_id: &str) -> String {
    format!("{}:{}", CLUB_PREFIX, club_id)
}

pub fn member(member_id: &str) -> String {
    format!("{}:{}", MEMBER_PREFIX, member_id)
}

pub fn members_by_club(club_id: &str) -> String {
    format!("{}:{}", MEMBERS_BY_CLUB_PREFIX, club_id)
}

pub fn user_role(uid: &str) -> String {
    format!("{}:{}", ROLE_PREFIX, uid)
}

/// `api:{method}:{path}` plus `:{params}` when a non-empty query string is given.
pub fn api_response(method: &str, path: &str, params: Option<&str>) -> String {
    match params {
        Some(params) if !params.is_empty() => {
            format!("{}:{}:{}:{}", API_PREFIX, method, path, params)
        }
        _ => format!("{}:{}:{}", API_PREFIX, method, path),
    }
}

/// Key for one page of a paginated query.
///
/// `cursor` is `"first"` for page one or the serialized cursor otherwise.
pub fn page(fingerprint: &str, cursor: &str) -> String {
    format!("{}:{}:{}", PAGE_PREFIX, fingerprint, cursor)
}

/// Pattern matching every page of one paginated query.
pub fn pages_of(fingerprint: &str) -> String {
    format!("{}:{}:*", PAGE_PREFIX, fingerprint)
}

/// Pattern matching every key of one family.
pub fn family(prefix: &str) -> String {
    format!("{}:*", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyPattern;

    #[test]
    fn test_literal_keys() {
        assert_eq!(user("u1"), "user:u1");
        assert_eq!(club("c9"), "club:c9");
        assert_eq!(member("m3"), "member:m3");
        assert_eq!(members_by_club("c9"), "members:club:c9");
        assert_eq!(user_role("u1"), "role:u1");
        assert_eq!(api_response("GET", "/api/clubs", None), "api:GET:/api/clubs");
        assert_eq!(
            api_response("GET", "/api/clubs", Some("page=2")),
            "api:GET:/api/clubs:page=2"
        );
        assert_eq!(api_response("GET", "/api/clubs", Some("")), "api:GET:/api/clubs");
    }

    #[test]
    fn test_families_do_not_collide() {
        let keys = [
            user("1"),
            club("1"),
            member("1"),
            members_by_club("1"),
            user_role("1"),
            api_response("GET", "1", None),
        ];
        let prefixes = [
            USER_PREFIX,
            CLUB_PREFIX,
            MEMBER_PREFIX,
            MEMBERS_BY_CLUB_PREFIX,
            ROLE_PREFIX,
            API_PREFIX,
        ];

        for (i, prefix) in prefixes.iter().enumerate() {
            let pattern = KeyPattern::new(&family(prefix));
            for (j, key) in keys.iter().enumerate() {
                assert_eq!(
                    pattern.matches(key),
                    i == j,
                    "pattern {} vs key {}",
                    prefix,
                    key
                );
            }
        }
    }

    #[test]
    fn test_page_keys() {
        assert_eq!(page("abc", "first"), "page:abc:first");
        let pattern = KeyPattern::new(&pages_of("abc"));
        assert!(pattern.matches(&page("abc", "after:doc7")));
        assert!(!pattern.matches(&page("abd", "first")));
    }
}
