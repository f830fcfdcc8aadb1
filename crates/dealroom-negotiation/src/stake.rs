//! # Stake Scoring
//!
//! ```text
//! stake = (priority / 5) * 0.4 + ((5 - flexibility) / 5) * 0.3 + |bias| * 0.3
//! ```
//!
//! Higher stake means the party cares more about the clause, is less
//! willing to move, or picked an option that strongly favors one side.
//! The result lies in `[0, 1]`.

use dealroom_core::{Bias, Flexibility, Priority};

const PRIORITY_WEIGHT: f64 = 0.4;
const INFLEXIBILITY_WEIGHT: f64 = 0.3;
const BIAS_WEIGHT: f64 = 0.3;

/// Stake of one party in one clause.
pub fn stake(priority: Priority, flexibility: Flexibility, bias: Bias) -> f64 {
    (priority.as_f64() / 5.0) * PRIORITY_WEIGHT
        + ((5.0 - flexibility.as_f64()) / 5.0) * INFLEXIBILITY_WEIGHT
        + bias.magnitude() * BIAS_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(v: i64) -> Priority {
        Priority::new(v).unwrap()
    }
    fn f(v: i64) -> Flexibility {
        Flexibility::new(v).unwrap()
    }
    fn b(v: f64) -> Bias {
        Bias::new(v).unwrap()
    }

    #[test]
    fn reference_value() {
        // 0.32 + 0.18 + 0.24
        assert!((stake(p(4), f(2), b(0.8)) - 0.74).abs() < 1e-9);
    }

    #[test]
    fn bias_sign_is_ignored() {
        assert_eq!(stake(p(4), f(2), b(0.8)), stake(p(4), f(2), b(-0.8)));
    }

    #[test]
    fn low_priority_flexible_party() {
        // 0.16 + 0 + 0.03
        assert!((stake(p(2), f(5), b(0.1)) - 0.19).abs() < 1e-9);
    }

    #[test]
    fn extremes() {
        assert!((stake(p(1), f(5), b(0.0)) - 0.08).abs() < 1e-9);
        assert!((stake(p(5), f(1), b(-1.0)) - 0.94).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn stake_is_within_unit_interval(
            pr in 1i64..=5,
            fl in 1i64..=5,
            bias in -1.0f64..=1.0,
        ) {
            let s = stake(p(pr), f(fl), b(bias));
            prop_assert!((0.0..=1.0).contains(&s), "stake {s} out of range");
        }

        #[test]
        fn stake_grows_with_priority(fl in 1i64..=5, bias in -1.0f64..=1.0) {
            for pr in 1..5 {
                prop_assert!(stake(p(pr), f(fl), b(bias)) < stake(p(pr + 1), f(fl), b(bias)));
            }
        }
    }
}
