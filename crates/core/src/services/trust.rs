//! Trust score derivation.
//!
//! The score is never stored. It is recomputed from the counters on every
//! read and only travels embedded in a profile or metrics snapshot.

/// No-show count at which moderators are advised to ban.
pub const NO_SHOW_BAN_THRESHOLD: i32 = 5;

const VERIFICATION_WEIGHT: f64 = 10.0;
const NO_SHOW_PENALTY: f64 = 20.0;
const ATTENDANCE_WEIGHT: f64 = 0.5;

/// Bounded 0..=100 score, rounded to one decimal place.
#[must_use]
pub fn trust_score(
    verification_count: i32,
    no_show_count: i32,
    activities_attended_count: i32,
) -> f64 {
    let raw = f64::from(verification_count) * VERIFICATION_WEIGHT
        - f64::from(no_show_count) * NO_SHOW_PENALTY
        + f64::from(activities_attended_count) * ATTENDANCE_WEIGHT;
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

/// Advisory shown once the no-show count reaches the ban threshold.
///
/// Reaching the threshold never bans by itself; the decision stays with a
/// moderator.
#[must_use]
pub fn no_show_warning(no_show_count: i32) -> Option<String> {
    (no_show_count >= NO_SHOW_BAN_THRESHOLD).then(|| {
        format!(
            "User now has {no_show_count} no-shows. Threshold for automatic ban is {NO_SHOW_BAN_THRESHOLD}."
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_clamps_high() {
        assert_eq!(trust_score(12, 0, 34), 100.0);
    }

    #[test]
    fn test_score_clamps_low() {
        assert_eq!(trust_score(0, 5, 0), 0.0);
    }

    #[test]
    fn test_score_rounds_to_one_decimal() {
        assert_eq!(trust_score(1, 0, 3), 11.5);
        assert_eq!(trust_score(2, 1, 1), 0.5);
    }

    #[test]
    fn test_new_user_scores_zero() {
        assert_eq!(trust_score(0, 0, 0), 0.0);
    }

    #[test]
    fn test_warning_starts_at_threshold() {
        assert!(no_show_warning(4).is_none());
        let warning = no_show_warning(5).unwrap_or_default();
        assert!(warning.contains("5 no-shows"));
        assert!(warning.contains("automatic ban"));
        assert!(no_show_warning(7).is_some());
    }
}
