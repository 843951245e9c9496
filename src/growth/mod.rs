//! WHO Child Growth Standards percentile lookup (LMS method, 0–24 months).
//!
//! Percentile formula: X = M × (1 + L × S × Z)^(1/L), inverted to
//! Z = ((X/M)^L − 1) / (L × S), with the log-normal form when L ≈ 0.

mod reference;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Baby, GrowthRecord, Sex};
use reference::{
    LmsEntry, HEAD_BOYS, HEAD_GIRLS, HEIGHT_BOYS, HEIGHT_GIRLS, WEIGHT_BOYS, WEIGHT_GIRLS,
};

/// Average days per month used when converting an age to fractional months.
const DAYS_PER_MONTH: f64 = 30.4375;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Weight,
    Height,
    Head,
}

/// Fractional age in months on a given date; negative when `on` precedes
/// `birth_date`.
pub fn age_in_months(birth_date: NaiveDate, on: NaiveDate) -> f64 {
    (on - birth_date).num_days() as f64 / DAYS_PER_MONTH
}

/// WHO percentile (0–100) for a measurement, or `None` when the age is
/// outside the 0–24 month reference range.
pub fn percentile(value: f64, age_months: f64, sex: Sex, metric: Metric) -> Option<u8> {
    let table = match (metric, sex) {
        (Metric::Weight, Sex::Boy) => WEIGHT_BOYS,
        (Metric::Weight, Sex::Girl) => WEIGHT_GIRLS,
        (Metric::Height, Sex::Boy) => HEIGHT_BOYS,
        (Metric::Height, Sex::Girl) => HEIGHT_GIRLS,
        (Metric::Head, Sex::Boy) => HEAD_BOYS,
        (Metric::Head, Sex::Girl) => HEAD_GIRLS,
    };

    let (l, m, s) = interpolate(table, age_months)?;

    let z = if l.abs() < 0.001 {
        (value / m).ln() / s
    } else {
        ((value / m).powf(l) - 1.0) / (l * s)
    };

    Some((normal_cdf(z) * 100.0).round() as u8)
}

/// Percentile for one metric of a growth record, given the baby's birth
/// date and sex. `None` when either is missing, the metric was not
/// measured, or the record predates birth.
pub fn record_percentile(record: &GrowthRecord, baby: &Baby, metric: Metric) -> Option<u8> {
    let birth_date = baby.birth_date?;
    let sex = baby.sex?;

    let age = age_in_months(birth_date, record.date);
    if age < 0.0 {
        return None;
    }

    let value = match metric {
        Metric::Weight => record.weight_kg,
        Metric::Height => record.height_cm,
        Metric::Head => record.head_cm,
    }?;

    percentile(value, age, sex, metric)
}

/// Linearly interpolated LMS parameters for a fractional age, clamped to
/// the table's range.
fn interpolate(table: &[LmsEntry], age_months: f64) -> Option<(f64, f64, f64)> {
    if age_months < 0.0 {
        return None;
    }

    let last = table.last()?;
    if age_months > last.age_months {
        return None;
    }

    let mut lower = table[0];
    let mut upper = table[0];
    for pair in table.windows(2) {
        if age_months >= pair[0].age_months && age_months <= pair[1].age_months {
            lower = pair[0];
            upper = pair[1];
            break;
        }
    }

    if lower.age_months == upper.age_months {
        return Some((lower.l, lower.m, lower.s));
    }

    let frac = (age_months - lower.age_months) / (upper.age_months - lower.age_months);
    Some((
        lower.l + frac * (upper.l - lower.l),
        lower.m + frac * (upper.m - lower.m),
        lower.s + frac * (upper.s - lower.s),
    ))
}

/// Standard normal CDF, Abramowitz & Stegun approximation 7.1.26.
fn normal_cdf(z: f64) -> f64 {
    if z < -6.0 {
        return 0.0;
    }
    if z > 6.0 {
        return 1.0;
    }

    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    let x = z.abs() / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn median_measurement_is_fiftieth_percentile() {
        // M for weight, boys, age 0 is 3.3464 kg.
        assert_eq!(percentile(3.3464, 0.0, Sex::Boy, Metric::Weight), Some(50));
        // M for height, girls, age 6 months is 65.7311 cm.
        assert_eq!(percentile(65.7311, 6.0, Sex::Girl, Metric::Height), Some(50));
    }

    #[test]
    fn one_sd_above_median_is_eighty_fourth() {
        // Height tables have L = 1, so M * (1 + S) sits exactly one SD up.
        let value = 65.7311 * (1.0 + 0.03448);
        assert_eq!(percentile(value, 6.0, Sex::Girl, Metric::Height), Some(84));
    }

    #[test]
    fn fractional_ages_interpolate_between_rows() {
        // Halfway between the 0 and 1 month medians for boy weight.
        let mid_median = (3.3464 + 4.4709) / 2.0;
        assert_eq!(percentile(mid_median, 0.5, Sex::Boy, Metric::Weight), Some(50));
    }

    #[test]
    fn out_of_range_ages_yield_none() {
        assert_eq!(percentile(10.0, -0.5, Sex::Boy, Metric::Weight), None);
        assert_eq!(percentile(12.0, 25.0, Sex::Boy, Metric::Weight), None);
    }

    #[test]
    fn extreme_values_saturate() {
        assert_eq!(percentile(1.0, 6.0, Sex::Boy, Metric::Weight), Some(0));
        assert_eq!(percentile(20.0, 6.0, Sex::Boy, Metric::Weight), Some(100));
    }

    #[test]
    fn age_conversion_uses_average_month() {
        let birth = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let on = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let age = age_in_months(birth, on);
        assert!((age - 61.0 / DAYS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn record_percentile_requires_birth_date_and_sex() {
        let created = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();
        let record = GrowthRecord {
            id: "g1".into(),
            baby_id: "b1".into(),
            date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            weight_kg: Some(7.9340),
            height_cm: None,
            head_cm: None,
            created_at: created,
        };
        let mut baby = Baby {
            id: "b1".into(),
            name: "Nour".into(),
            birth_date: None,
            sex: Some(Sex::Boy),
            created_at: created,
        };

        assert_eq!(record_percentile(&record, &baby, Metric::Weight), None);

        // Roughly six average months before the measurement date.
        baby.birth_date = NaiveDate::from_ymd_opt(2026, 7, 1)
            .unwrap()
            .checked_sub_days(chrono::Days::new(183));
        let pct = record_percentile(&record, &baby, Metric::Weight).unwrap();
        assert!((49..=51).contains(&pct), "got {pct}");

        // Metric that was never measured.
        assert_eq!(record_percentile(&record, &baby, Metric::Height), None);
    }
}
