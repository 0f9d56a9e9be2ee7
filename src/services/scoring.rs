/// Lowest final grade accepted at submission; maps to a relevance of 0.
pub const MIN_GRADE: f64 = 16.0;
/// Grade at which relevance saturates at 100.
pub const MAX_GRADE: f64 = 20.0;

/// Linear normalisation of a final grade onto 0..=100.
pub fn relevance_score(media_final: f64) -> i32 {
    if media_final.is_nan() || media_final <= MIN_GRADE {
        return 0;
    }
    if media_final >= MAX_GRADE {
        return 100;
    }
    (((media_final - MIN_GRADE) / (MAX_GRADE - MIN_GRADE)) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_fifty() {
        assert_eq!(relevance_score(18.0), 50);
    }

    #[test]
    fn clamps_outside_the_grade_window() {
        assert_eq!(relevance_score(15.9), 0);
        assert_eq!(relevance_score(0.0), 0);
        assert_eq!(relevance_score(20.1), 100);
        assert_eq!(relevance_score(21.0), 100);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(relevance_score(16.0), 0);
        assert_eq!(relevance_score(20.0), 100);
    }

    #[test]
    fn rounds_to_nearest_integer() {
        assert_eq!(relevance_score(17.5), 38);
        assert_eq!(relevance_score(16.01), 0);
        assert_eq!(relevance_score(16.03), 1);
        assert_eq!(relevance_score(19.99), 100);
    }

    #[test]
    fn matches_formula_across_the_window() {
        let mut grade = 16.0;
        while grade <= 20.0 {
            let expected = ((grade - 16.0) / 4.0 * 100.0_f64).round() as i32;
            assert_eq!(relevance_score(grade), expected, "grade {}", grade);
            grade += 0.05;
        }
    }

    #[test]
    fn nan_scores_zero() {
        assert_eq!(relevance_score(f64::NAN), 0);
    }
}
