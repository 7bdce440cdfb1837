//! Stat reconciliation: internally consistent shot counters and accuracy.

/// Result of reconciling the shot counters for one player.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconciled {
    pub shots_hit: u32,
    pub accuracy: String,
    /// True when ShotsHit exceeded ShotsFired and was clamped down. An OCR
    /// over-read is assumed, never the reverse.
    pub hits_clamped: bool,
}

/// Caps hits at fired shots and settles on a final accuracy. An OCR-derived
/// accuracy inside [0, 100] is trusted verbatim; otherwise accuracy derives
/// from the (clamped) counters, capped at 100.
pub fn reconcile(shots_fired: u32, shots_hit: u32, ocr_accuracy: Option<f32>) -> Reconciled {
    let hits_clamped = shots_hit > shots_fired;
    let shots_hit = shots_hit.min(shots_fired);

    let accuracy = match ocr_accuracy {
        Some(value) if (0.0..=100.0).contains(&value) => value,
        _ => {
            if shots_fired > 0 {
                ((shots_hit as f32 / shots_fired as f32) * 100.0).min(100.0)
            } else {
                0.0
            }
        }
    };

    Reconciled {
        shots_hit,
        accuracy: format_accuracy(accuracy),
        hits_clamped,
    }
}

/// One decimal place with a trailing percent sign, always.
pub fn format_accuracy(value: f32) -> String {
    format!("{value:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_clamped_to_fired() {
        let result = reconcile(10, 15, None);
        assert_eq!(result.shots_hit, 10);
        assert_eq!(result.accuracy, "100.0%");
        assert!(result.hits_clamped);
    }

    #[test]
    fn test_zero_shots_is_zero_accuracy() {
        let result = reconcile(0, 0, None);
        assert_eq!(result.shots_hit, 0);
        assert_eq!(result.accuracy, "0.0%");
        assert!(!result.hits_clamped);
    }

    #[test]
    fn test_ocr_accuracy_in_range_is_trusted() {
        let result = reconcile(100, 50, Some(78.5));
        assert_eq!(result.accuracy, "78.5%");
    }

    #[test]
    fn test_ocr_accuracy_out_of_range_is_derived() {
        let result = reconcile(100, 50, Some(150.0));
        assert_eq!(result.accuracy, "50.0%");
        let result = reconcile(100, 50, Some(-1.0));
        assert_eq!(result.accuracy, "50.0%");
    }

    #[test]
    fn test_derived_accuracy() {
        let result = reconcile(80, 60, None);
        assert_eq!(result.accuracy, "75.0%");
        assert!(!result.hits_clamped);
    }

    #[test]
    fn test_formatting_is_one_decimal() {
        assert_eq!(format_accuracy(33.333), "33.3%");
        assert_eq!(format_accuracy(100.0), "100.0%");
        assert_eq!(format_accuracy(0.0), "0.0%");
    }
}
