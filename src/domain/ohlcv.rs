//! OHLCV bar representation.

use chrono::NaiveDate;

/// One trading day of raw market data.
///
/// `volume` is `None` for instruments that do not report it (currency pairs).
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.range();
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Sort bars most recent first. Stable, so equal dates keep their relative order.
pub fn sort_descending(bars: &mut [OhlcvBar]) {
    bars.sort_by(|a, b| b.date.cmp(&a.date));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: Some(50_000.0),
        }
    }

    #[test]
    fn range_is_high_minus_low() {
        assert!((sample_bar().range() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sort_descending_puts_latest_first() {
        let mut a = sample_bar();
        let mut b = sample_bar();
        let mut c = sample_bar();
        a.date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        b.date = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        c.date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let mut bars = vec![a, b, c];
        sort_descending(&mut bars);
        let days: Vec<u32> = bars.iter().map(|b| chrono::Datelike::day(&b.date)).collect();
        assert_eq!(days, vec![9, 5, 2]);
    }
}
