//! Pagination defaults and clamping helpers shared by list endpoints.

/// Default number of rows per page for list queries.
pub const DEFAULT_LIST_LIMIT: i64 = 25;

/// Maximum number of rows per page for list queries.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_uses_default_when_none() {
        assert_eq!(clamp_limit(None, 25, 100), 25);
    }

    #[test]
    fn clamp_limit_respects_max() {
        assert_eq!(clamp_limit(Some(500), 25, 100), 100);
    }

    #[test]
    fn clamp_limit_floors_at_one() {
        assert_eq!(clamp_limit(Some(-5), 25, 100), 1);
        assert_eq!(clamp_limit(Some(0), 25, 100), 1);
    }

    #[test]
    fn clamp_offset_defaults_to_zero() {
        assert_eq!(clamp_offset(None), 0);
    }

    #[test]
    fn clamp_offset_floors_negative() {
        assert_eq!(clamp_offset(Some(-10)), 0);
    }

    #[test]
    fn clamp_offset_passes_positive() {
        assert_eq!(clamp_offset(Some(40)), 40);
    }
}
