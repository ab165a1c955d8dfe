/// Unweighted mean of `ratings`, or 0.0 when there are none.
///
/// No rounding is applied; `[5, 1, 5]` yields `11.0 / 3.0` exactly as f64
/// division produces it.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let total: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    total as f64 / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_review_set_averages_to_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn mean_is_not_rounded() {
        assert_eq!(average_rating(&[5, 1, 5]), 11.0 / 3.0);
        assert_eq!(average_rating(&[5, 5]), 5.0);
        assert_eq!(average_rating(&[4]), 4.0);
    }
}
