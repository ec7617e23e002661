use std::str::FromStr;
use serde::Deserialize;

/// Which exit codes the `exec_command_failed_rate` metric counts as `1`.
///
/// - `NonZeroExit` (default): `1` means the command failed (`exit_code != 0`).
///   A rate of 0.0 across a run means nothing failed.
/// - `ZeroExit`: `1` means the command exited with `0`. This is the legacy
///   polarity of the metric and is kept selectable for dashboards built on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedRatePolarity {
    NonZeroExit,
    ZeroExit,
}

impl Default for FailedRatePolarity {
    fn default() -> Self {
        FailedRatePolarity::NonZeroExit
    }
}

impl FailedRatePolarity {
    /// Rate sample value for an execution that exited with `exit_code`.
    pub fn value_for(self, exit_code: i32) -> f64 {
        let flagged = match self {
            FailedRatePolarity::NonZeroExit => exit_code != 0,
            FailedRatePolarity::ZeroExit => exit_code == 0,
        };
        if flagged { 1.0 } else { 0.0 }
    }
}

impl FromStr for FailedRatePolarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "non_zero_exit" => Ok(FailedRatePolarity::NonZeroExit),
            "zero_exit" => Ok(FailedRatePolarity::ZeroExit),
            other => Err(format!(
                "invalid failed_rate_polarity: {other} (expected \"non_zero_exit\" or \"zero_exit\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polarity_flags_failures() {
        let polarity = FailedRatePolarity::default();
        assert_eq!(polarity.value_for(0), 0.0);
        assert_eq!(polarity.value_for(1), 1.0);
        assert_eq!(polarity.value_for(-1), 1.0);
        assert_eq!(polarity.value_for(137), 1.0);
    }

    #[test]
    fn zero_exit_polarity_flags_successes() {
        let polarity = FailedRatePolarity::ZeroExit;
        assert_eq!(polarity.value_for(0), 1.0);
        assert_eq!(polarity.value_for(2), 0.0);
    }

    #[test]
    fn parses_from_str() {
        assert_eq!(
            " Zero_Exit ".parse::<FailedRatePolarity>(),
            Ok(FailedRatePolarity::ZeroExit)
        );
        assert!("inverted".parse::<FailedRatePolarity>().is_err());
    }
}
