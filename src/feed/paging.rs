//! Page-parameter handling for the feed location.

/// Posts fetched per request.
pub const PAGE_SIZE: u32 = 5;

/// Parse a raw `page` navigation parameter.
///
/// The whole trimmed value must be an integer. Anything else (`"7abc"`,
/// `"3.9"`, empty) is page 1, as is anything below 1.
pub fn parse_page_param(raw: Option<&str>) -> u32 {
    let Some(digits) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 1;
    };
    match digits.parse::<i64>() {
        Ok(n) => coerce_page(n),
        // Overlong positive numbers saturate rather than fall back.
        Err(_) if is_long_positive_integer(digits) => u32::MAX,
        Err(_) => 1,
    }
}

fn is_long_positive_integer(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `max(1, n)`, saturated into `u32`.
pub fn coerce_page(n: i64) -> u32 {
    u32::try_from(n.max(1)).unwrap_or(u32::MAX)
}

/// Row offset of the first post on `page`.
pub fn page_offset(page: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE)
}

/// The `page` parameter as it should appear in a location, `None` for page 1.
pub fn canonical_page_param(page: u32) -> Option<u32> {
    (page > 1).then_some(page)
}

/// Location string for the feed at `page`: `/posts` or `/posts?page=N`.
pub fn feed_location(page: u32) -> String {
    match canonical_page_param(page) {
        Some(n) => format!("/posts?page={}", n),
        None => "/posts".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_missing_and_garbage() {
        assert_eq!(parse_page_param(None), 1);
        assert_eq!(parse_page_param(Some("")), 1);
        assert_eq!(parse_page_param(Some("abc")), 1);
        assert_eq!(parse_page_param(Some("-")), 1);
    }

    #[test]
    fn test_parse_below_one_coerces() {
        assert_eq!(parse_page_param(Some("0")), 1);
        assert_eq!(parse_page_param(Some("-4")), 1);
    }

    #[test]
    fn test_parse_whole_integers() {
        assert_eq!(parse_page_param(Some("3")), 3);
        assert_eq!(parse_page_param(Some(" 12 ")), 12);
        assert_eq!(parse_page_param(Some("+2")), 2);
    }

    #[test]
    fn test_parse_partial_numbers_fall_back() {
        assert_eq!(parse_page_param(Some("7abc")), 1);
        assert_eq!(parse_page_param(Some("3.9")), 1);
        assert_eq!(parse_page_param(Some("1e3")), 1);
        assert_eq!(parse_page_param(Some("4 5")), 1);
    }

    #[test]
    fn test_parse_overlong_saturates() {
        assert_eq!(parse_page_param(Some("99999999999999999999999")), u32::MAX);
    }

    #[test]
    fn test_offsets() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(2), 5);
        assert_eq!(page_offset(11), 50);
        assert_eq!(page_offset(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_location_canonicalises_first_page() {
        assert_eq!(feed_location(1), "/posts");
        assert_eq!(feed_location(4), "/posts?page=4");
        assert_eq!(canonical_page_param(1), None);
    }

    proptest! {
        #[test]
        fn prop_coerced_page_is_positive(n in any::<i64>()) {
            let page = coerce_page(n);
            prop_assert!(page >= 1);
            if (1..=i64::from(u32::MAX)).contains(&n) {
                prop_assert_eq!(i64::from(page), n);
            }
        }

        #[test]
        fn prop_parse_never_below_one(s in ".{0,12}") {
            prop_assert!(parse_page_param(Some(&s)) >= 1);
        }
    }
}
