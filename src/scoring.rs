//! Line-clear points, level progression and gravity speed.

/// Points per simultaneous clear, indexed by row count, before the level
/// multiplier.
pub const LINE_SCORES: [u32; 5] = [0, 40, 100, 300, 1200];
pub const LINES_PER_LEVEL: u32 = 10;
pub const BASE_DROP_INTERVAL_MS: f64 = 1000.0;
const SPEED_FACTOR: f64 = 0.9;

pub fn line_clear_score(rows: usize, level: u32) -> u32 {
    let base = LINE_SCORES.get(rows).copied().unwrap_or(0);
    base.saturating_mul(level)
}

pub fn level_for_lines(lines: u32) -> u32 {
    lines / LINES_PER_LEVEL + 1
}

/// Gravity period for `level`: 10% faster per level, no floor.
pub fn drop_interval_ms(base_ms: f64, level: u32) -> f64 {
    base_ms * SPEED_FACTOR.powi(level.saturating_sub(1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_scores_scale_with_level() {
        assert_eq!(line_clear_score(0, 5), 0);
        assert_eq!(line_clear_score(1, 1), 40);
        assert_eq!(line_clear_score(2, 3), 300);
        assert_eq!(line_clear_score(3, 2), 600);
        assert_eq!(line_clear_score(4, 1), 1200);
        assert_eq!(line_clear_score(5, 1), 0);
    }

    #[test]
    fn level_rises_every_ten_lines() {
        assert_eq!(level_for_lines(0), 1);
        assert_eq!(level_for_lines(9), 1);
        assert_eq!(level_for_lines(10), 2);
        assert_eq!(level_for_lines(25), 3);
    }

    #[test]
    fn drop_interval_decays_geometrically() {
        assert_eq!(drop_interval_ms(BASE_DROP_INTERVAL_MS, 1), 1000.0);
        assert!((drop_interval_ms(BASE_DROP_INTERVAL_MS, 2) - 900.0).abs() < 1e-9);
        assert!((drop_interval_ms(BASE_DROP_INTERVAL_MS, 3) - 810.0).abs() < 1e-9);
        assert!(drop_interval_ms(BASE_DROP_INTERVAL_MS, 30) < 50.0);
    }
}
