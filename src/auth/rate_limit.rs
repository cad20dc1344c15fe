/*!
 * # Login Lockout Policy
 *
 * Failed password attempts are counted on the user row. Reaching the
 * configured maximum locks the account for a fixed window; the counter
 * resets on the next successful login.
 */

use chrono::{DateTime, Duration, Utc};

use crate::errors::ServiceError;

/// Lockout configuration
#[derive(Clone, Debug)]
pub struct LoginPolicy {
    pub max_attempts: i32,
    pub lockout: Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout: Duration::minutes(15),
        }
    }
}

/// What a failed password attempt does to the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Attempt recorded; the caller may retry
    Retry { attempts: i32, remaining: i32 },
    /// Attempt limit reached; the account is locked
    Locked {
        attempts: i32,
        locked_until: DateTime<Utc>,
    },
}

/// Whole minutes until `locked_until`, rounded up and never below one.
pub fn wait_minutes(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (locked_until - now).num_seconds().max(0);
    ((seconds + 59) / 60).max(1)
}

impl LoginPolicy {
    /// Errors with `AccountLocked` while a lock is still in force.
    pub fn check_locked(
        &self,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        match locked_until {
            Some(until) if until > now => Err(ServiceError::AccountLocked {
                locked_until: until,
                wait_minutes: wait_minutes(until, now),
            }),
            _ => Ok(()),
        }
    }

    /// Counts one more failure on top of `previous_attempts`.
    ///
    /// An expired lock starts the count over.
    pub fn record_failure(
        &self,
        previous_attempts: i32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LoginOutcome {
        let base = match locked_until {
            Some(until) if until <= now => 0,
            _ => previous_attempts.max(0),
        };
        let attempts = base + 1;
        if attempts >= self.max_attempts {
            LoginOutcome::Locked {
                attempts,
                locked_until: now + self.lockout,
            }
        } else {
            LoginOutcome::Retry {
                attempts,
                remaining: self.max_attempts - attempts,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(0, LoginOutcome::Retry { attempts: 1, remaining: 4 })]
    #[case(3, LoginOutcome::Retry { attempts: 4, remaining: 1 })]
    fn failures_below_the_limit_report_remaining(#[case] previous: i32, #[case] expected: LoginOutcome) {
        let policy = LoginPolicy::default();
        assert_eq!(policy.record_failure(previous, None, Utc::now()), expected);
    }

    #[test]
    fn fifth_failure_locks_for_the_window() {
        let policy = LoginPolicy::default();
        let now = Utc::now();
        assert_eq!(
            policy.record_failure(4, None, now),
            LoginOutcome::Locked {
                attempts: 5,
                locked_until: now + Duration::minutes(15)
            }
        );
    }

    #[test]
    fn expired_lock_restarts_the_count() {
        let policy = LoginPolicy::default();
        let now = Utc::now();
        let outcome = policy.record_failure(5, Some(now - Duration::seconds(1)), now);
        assert_eq!(outcome, LoginOutcome::Retry { attempts: 1, remaining: 4 });
    }

    #[test]
    fn active_lock_is_reported_with_wait() {
        let policy = LoginPolicy::default();
        let now = Utc::now();
        let until = now + Duration::seconds(61);
        assert_matches!(
            policy.check_locked(Some(until), now),
            Err(ServiceError::AccountLocked { wait_minutes: 2, .. })
        );
        assert!(policy.check_locked(Some(now - Duration::seconds(1)), now).is_ok());
        assert!(policy.check_locked(None, now).is_ok());
    }

    #[rstest]
    #[case(0, 1)]
    #[case(59, 1)]
    #[case(60, 1)]
    #[case(61, 2)]
    #[case(900, 15)]
    fn wait_is_rounded_up(#[case] seconds: i64, #[case] minutes: i64) {
        let now = Utc::now();
        assert_eq!(wait_minutes(now + Duration::seconds(seconds), now), minutes);
    }
}
