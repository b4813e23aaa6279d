//! Authorization model
//!
//! `AuthorizationState` is what the sensor reports; `AuthorizationMode` is what
//! a configuration needs and what the locator asks the sensor to prompt for.

use serde::{Deserialize, Serialize};

/// Sensor authorization state
///
/// Only the sensor's authorization callback moves this value; the locator
/// never mutates it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// The user has not been asked yet
    #[default]
    NotDetermined,
    /// The user or the system refused access
    Denied,
    /// Access granted while the consumer is in the foreground
    RestrictedForeground,
    /// Unrestricted access
    FullAccess,
}

impl AuthorizationState {
    /// Whether this state grants at least `mode`.
    pub fn satisfies(self, mode: AuthorizationMode) -> bool {
        match mode {
            AuthorizationMode::WhenInUse => {
                matches!(self, Self::RestrictedForeground | Self::FullAccess)
            }
            AuthorizationMode::Always => matches!(self, Self::FullAccess),
        }
    }

    /// Denied is final until the sensor reports otherwise.
    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

/// Authorization level a configuration needs (ordered by permissiveness)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Foreground-only access
    WhenInUse,
    /// Background access
    Always,
}

impl AuthorizationMode {
    /// Mode to prompt for.
    ///
    /// The most permissive mode declared in configuration wins, as long as it
    /// covers `required`. With nothing usable declared, prompt for `required`.
    ///
    /// # Examples
    /// ```
    /// use contracts::AuthorizationMode;
    ///
    /// let declared = [AuthorizationMode::WhenInUse, AuthorizationMode::Always];
    /// assert_eq!(
    ///     AuthorizationMode::preferred(&declared, AuthorizationMode::WhenInUse),
    ///     AuthorizationMode::Always
    /// );
    /// assert_eq!(
    ///     AuthorizationMode::preferred(&[], AuthorizationMode::WhenInUse),
    ///     AuthorizationMode::WhenInUse
    /// );
    /// ```
    pub fn preferred(declared: &[AuthorizationMode], required: AuthorizationMode) -> Self {
        match declared.iter().copied().max() {
            Some(mode) if mode >= required => mode,
            _ => required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfies() {
        use AuthorizationMode::*;
        use AuthorizationState::*;

        assert!(!NotDetermined.satisfies(WhenInUse));
        assert!(!Denied.satisfies(WhenInUse));
        assert!(RestrictedForeground.satisfies(WhenInUse));
        assert!(!RestrictedForeground.satisfies(Always));
        assert!(FullAccess.satisfies(Always));
    }

    #[test]
    fn test_preferred_never_below_required() {
        let declared = [AuthorizationMode::WhenInUse];
        assert_eq!(
            AuthorizationMode::preferred(&declared, AuthorizationMode::Always),
            AuthorizationMode::Always
        );
    }
}
