use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use prople_courier_core::polling::types::{DEFAULT_INTERVAL_MILLIS, DEFAULT_MAX_ATTEMPTS};
use prople_courier_core::polling::PollOptions;

use crate::common::types::{CommonError, ToValidate};

/// `Polling` configures how long the node waits for the counterparty on every protocol step
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Polling {
    pub(super) interval_millis: u64,
    pub(super) max_attempts: u32,
    pub(super) deadline_secs: Option<u64>,
    pub(super) backoff_factor: Option<u32>,
    pub(super) max_interval_millis: Option<u64>,
}

impl Polling {
    pub fn poll_options(&self) -> PollOptions {
        let interval = Duration::from_millis(self.interval_millis);
        let options = match self.deadline_secs {
            Some(secs) => PollOptions::new(interval).with_deadline(Duration::from_secs(secs)),
            None => PollOptions::new(interval).with_max_attempts(self.max_attempts),
        };

        match self.backoff_factor {
            Some(factor) if factor > 1 => {
                let max_interval = self
                    .max_interval_millis
                    .map(Duration::from_millis)
                    .unwrap_or(interval);

                options.with_backoff(factor, max_interval)
            }
            _ => options,
        }
    }
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_millis: DEFAULT_INTERVAL_MILLIS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline_secs: None,
            backoff_factor: None,
            max_interval_millis: None,
        }
    }
}

impl ToValidate for Polling {
    fn validate(&self) -> Result<(), CommonError> {
        if self.interval_millis == 0 {
            return Err(CommonError::ValidationError(
                "config: polling:interval_millis must be greater than zero".to_string(),
            ));
        }

        if self.max_attempts == 0 && self.deadline_secs.is_none() {
            return Err(CommonError::ValidationError(
                "config: polling:max_attempts or polling:deadline_secs is missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use table_test::table_test;

    use crate::common::helpers;

    #[test]
    fn test_parse_polling_from_toml() {
        let polling: Polling = toml::from_str(
            r#"
            interval_millis = 500
            max_attempts = 10
            backoff_factor = 2
            max_interval_millis = 4000
            "#,
        )
        .unwrap();

        let options = polling.poll_options();
        assert_eq!(options.interval(), Duration::from_millis(500));
        assert_eq!(options.max_attempts(), Some(10));
        assert_eq!(
            options.next_interval(Duration::from_millis(500)),
            Duration::from_millis(1000)
        );
        assert_eq!(
            options.next_interval(Duration::from_millis(4000)),
            Duration::from_millis(4000)
        );
    }

    #[test]
    fn test_deadline_replaces_attempts() {
        let polling = Polling {
            deadline_secs: Some(30),
            ..Default::default()
        };

        let options = polling.poll_options();
        assert_eq!(options.deadline(), Some(Duration::from_secs(30)));
        assert_eq!(options.max_attempts(), None);
    }

    #[test]
    fn test_validation() {
        let table = vec![
            ((2000, 60, None), true),
            ((0, 60, None), false),
            ((2000, 0, None), false),
            ((2000, 0, Some(10)), true),
        ];

        for (validator, input, expected) in table_test!(table) {
            let (interval_millis, max_attempts, deadline_secs) = input;
            let polling = Polling {
                interval_millis,
                max_attempts,
                deadline_secs,
                ..Default::default()
            };

            let actual = helpers::validate(polling).is_ok();
            validator
                .given(&format!("{:?}", input))
                .when("validate polling config")
                .then(&format!("valid: {}", expected))
                .assert_eq(expected, actual);
        }
    }
}
