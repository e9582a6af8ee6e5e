//! Self-rating scale
//!
//! Users rate their own understanding of a paper on a six-step scale. Step
//! `n` is stored as `n / 5`.

use papermind_common::errors::{AppError, Result};

pub const MAX_STEP: u8 = 5;

const LABELS: [&str; MAX_STEP as usize + 1] = [
    "Not rated",
    "Lost",
    "Shaky",
    "Getting there",
    "Solid",
    "Nailed it",
];

/// Stored value for a scale step
pub fn rating_from_step(step: u8) -> Result<f64> {
    if step > MAX_STEP {
        return Err(AppError::validation(
            "rating",
            format!("Rating must be between 0 and {}", MAX_STEP),
        ));
    }
    Ok(f64::from(step) / f64::from(MAX_STEP))
}

/// Nearest scale step for a stored value; unrated papers sit at 0
pub fn step_from_rating(rating: Option<f64>) -> u8 {
    match rating {
        Some(value) if value.is_finite() => {
            (value.clamp(0.0, 1.0) * f64::from(MAX_STEP)).round() as u8
        }
        _ => 0,
    }
}

pub fn step_label(step: u8) -> &'static str {
    LABELS[usize::from(step.min(MAX_STEP))]
}

/// Label for a stored rating
pub fn rating_label(rating: Option<f64>) -> &'static str {
    step_label(step_from_rating(rating))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_map_to_fifths() {
        assert_eq!(rating_from_step(0).unwrap(), 0.0);
        assert_eq!(rating_from_step(5).unwrap(), 1.0);
        assert!((rating_from_step(3).unwrap() - 0.6).abs() < 1e-9);
        assert!(matches!(rating_from_step(6), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_labels_follow_nearest_step() {
        assert_eq!(rating_label(None), "Not rated");
        assert_eq!(rating_label(Some(0.2)), "Lost");
        assert_eq!(rating_label(Some(0.61)), "Getting there");
        assert_eq!(rating_label(Some(1.0)), "Nailed it");
        assert_eq!(rating_label(Some(f64::NAN)), "Not rated");
    }

    #[test]
    fn test_every_step_round_trips() {
        for step in 0..=MAX_STEP {
            let value = rating_from_step(step).unwrap();
            assert_eq!(step_from_rating(Some(value)), step);
        }
    }
}
