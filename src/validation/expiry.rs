use chrono::{Local, NaiveDate};

use crate::models::ExpiryAssessment;
use crate::utils::PassportError;

pub struct ExpiryValidator;

impl ExpiryValidator {
    /// Assess an MRZ expiry date against today's local date.
    pub fn assess_now(expiry_date: &str, expiring_soon_days: i64) -> Result<ExpiryAssessment, PassportError> {
        let today = Local::now().naive_local().date();
        Self::assess(expiry_date, today, expiring_soon_days)
    }

    /// Assess an MRZ expiry date (YYMMDD) against `today`.
    ///
    /// A document is expired once `today` is past the expiry date; on the
    /// expiry day itself it is still valid with zero days left.
    pub fn assess(
        expiry_date: &str,
        today: NaiveDate,
        expiring_soon_days: i64,
    ) -> Result<ExpiryAssessment, PassportError> {
        let expiry = Self::parse_mrz_date(expiry_date)?;
        let is_expired = expiry < today;
        let days = (expiry - today).num_days();

        let assessment = ExpiryAssessment {
            is_expired,
            expiring_soon: !is_expired && days <= expiring_soon_days,
            expiry_date_formatted: expiry.format("%Y-%m-%d").to_string(),
            days_until_expiry: if is_expired { None } else { Some(days) },
            days_expired: if is_expired { Some(-days) } else { None },
        };
        log::debug!(
            "expiry {} assessed against {}: expired={}",
            assessment.expiry_date_formatted,
            today,
            is_expired
        );
        Ok(assessment)
    }

    /// Convert YYMMDD to a calendar date. Two-digit years always land in
    /// 2000-2099.
    pub fn parse_mrz_date(value: &str) -> Result<NaiveDate, PassportError> {
        if value.len() != 6 || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(PassportError::InvalidDate(value.to_string()));
        }
        let year = 2000 + value[0..2].parse::<i32>().map_err(|_| PassportError::InvalidDate(value.to_string()))?;
        let month = value[2..4].parse::<u32>().map_err(|_| PassportError::InvalidDate(value.to_string()))?;
        let day = value[4..6].parse::<u32>().map_err(|_| PassportError::InvalidDate(value.to_string()))?;

        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| PassportError::InvalidDate(value.to_string()))
    }

    /// YYMMDD to YYYY-MM-DD under the same century rule.
    pub fn mrz_date_to_iso(value: &str) -> Result<String, PassportError> {
        Ok(Self::parse_mrz_date(value)?.format("%Y-%m-%d").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_century_rule() {
        assert_eq!(ExpiryValidator::mrz_date_to_iso("000101").unwrap(), "2000-01-01");
        assert_eq!(ExpiryValidator::mrz_date_to_iso("300101").unwrap(), "2030-01-01");
        assert_eq!(ExpiryValidator::mrz_date_to_iso("991231").unwrap(), "2099-12-31");
    }

    #[test]
    fn test_expired_after_date() {
        let result = ExpiryValidator::assess("300101", date(2030, 6, 1), 90).unwrap();
        assert!(result.is_expired);
        assert!(!result.expiring_soon);
        assert_eq!(result.expiry_date_formatted, "2030-01-01");
        assert_eq!(result.days_expired, Some(151));
        assert_eq!(result.days_until_expiry, None);
    }

    #[test]
    fn test_not_expired_before_date() {
        let result = ExpiryValidator::assess("300101", date(2029, 12, 1), 90).unwrap();
        assert!(!result.is_expired);
        assert_eq!(result.days_until_expiry, Some(31));
        assert_eq!(result.days_expired, None);
        assert!(result.expiring_soon);
    }

    #[test]
    fn test_far_future_is_not_expiring_soon() {
        let result = ExpiryValidator::assess("300101", date(2026, 1, 1), 90).unwrap();
        assert!(!result.is_expired);
        assert!(!result.expiring_soon);
        assert_eq!(result.days_until_expiry, Some(1461));
    }

    #[test]
    fn test_expiry_day_itself_is_valid() {
        let result = ExpiryValidator::assess("300101", date(2030, 1, 1), 90).unwrap();
        assert!(!result.is_expired);
        assert_eq!(result.days_until_expiry, Some(0));
    }

    #[test]
    fn test_malformed_dates_carry_the_input() {
        for bad in ["301399", "300230", "3001", "30O101"] {
            match ExpiryValidator::assess(bad, date(2026, 1, 1), 90) {
                Err(PassportError::InvalidDate(value)) => assert_eq!(value, bad),
                other => panic!("expected InvalidDate for {}, got {:?}", bad, other),
            }
        }
    }
}
