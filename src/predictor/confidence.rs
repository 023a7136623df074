use crate::domain::PredictionMethod;

/// Upper bound on any reported confidence
pub const CONFIDENCE_CAP: u8 = 95;

/// Heuristic confidence for a prediction made by `method`.
///
/// A held-out R² raises the score to `round(r2 * 100)` when that beats the
/// method's base value, capped at 95. Non-finite R² values are ignored.
pub fn confidence_score(method: PredictionMethod, held_out_r2: Option<f64>) -> u8 {
    let base = method.base_confidence();

    match held_out_r2.filter(|r2| r2.is_finite()) {
        Some(r2) => {
            let from_r2 = (r2 * 100.0).round().clamp(0.0, 100.0) as u8;
            base.max(from_r2).min(CONFIDENCE_CAP)
        }
        None => base,
    }
}
