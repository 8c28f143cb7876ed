use std::str::FromStr;

use crate::prelude::*;

pub fn non_zero_usize(value: &str) -> Result<usize> {
    match FromStr::from_str(value)? {
        value if value >= 1 => Ok(value),
        _ => Err(anyhow!("expected a positive number")),
    }
}

pub fn finite_f64(value: &str) -> Result<f64> {
    match f64::from_str(value)? {
        value if value.is_finite() => Ok(value),
        value => Err(anyhow!("expected a finite number, got {}", value)),
    }
}

pub fn positive_f64(value: &str) -> Result<f64> {
    match finite_f64(value)? {
        value if value > 0.0 => Ok(value),
        value => Err(anyhow!("expected a positive number, got {}", value)),
    }
}

pub fn non_negative_f64(value: &str) -> Result<f64> {
    match finite_f64(value)? {
        value if value >= 0.0 => Ok(value),
        value => Err(anyhow!("expected a non-negative number, got {}", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_zero_usize_ok() -> crate::Result {
        assert_eq!(non_zero_usize("3")?, 3);
        assert!(non_zero_usize("0").is_err());
        assert!(non_zero_usize("-1").is_err());
        Ok(())
    }

    #[test]
    fn positive_f64_ok() -> crate::Result {
        assert_eq!(positive_f64("0.001")?, 0.001);
        assert!(positive_f64("0").is_err());
        assert!(positive_f64("inf").is_err());
        assert!(positive_f64("NaN").is_err());
        Ok(())
    }

    #[test]
    fn non_negative_f64_ok() -> crate::Result {
        assert_eq!(non_negative_f64("0")?, 0.0);
        assert!(non_negative_f64("-0.5").is_err());
        Ok(())
    }
}
