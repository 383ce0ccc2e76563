//! Notification dispatch.
//!
//! Lifecycle operations dispatch notifications strictly after the guarded
//! state change has committed. Delivery is best-effort: a failure here is
//! logged and must never roll back or fail the triggering operation.
//! The `Notifier` trait is the transport seam; the default sender logs
//! delivery metadata and succeeds, real transports (SMTP, API) implement
//! the same trait.

use anyhow::Result;
use serde_json::json;
use tracing::{error, info};

/// Every outbound template kind with its payload. One-time passwords
/// appear here and nowhere else: exactly once, straight into the message.
#[derive(Clone, Debug)]
pub enum Notification {
    LeagueReviewRequested {
        to: String,
        league_name: String,
        city: String,
        state: String,
        contact_name: String,
        validate_url: String,
        reject_url: String,
    },
    LeagueValidated {
        to: String,
        first_name: String,
        league_name: String,
        one_time_password: String,
    },
    LeagueRejected {
        to: String,
        first_name: String,
        league_name: String,
    },
    LeaguePasswordReset {
        to: String,
        first_name: String,
        one_time_password: String,
    },
    CoachRegistered {
        to: String,
        coach_name: String,
        league_name: String,
    },
    CoachWelcome {
        to: String,
        first_name: String,
        league_name: String,
        one_time_password: String,
    },
    CoachValidated {
        to: String,
        first_name: String,
        league_name: String,
        one_time_password: String,
    },
    CoachRejected {
        to: String,
        first_name: String,
        league_name: String,
    },
    CoachPasswordReset {
        to: String,
        first_name: String,
        one_time_password: String,
    },
}

impl Notification {
    #[must_use]
    pub fn template(&self) -> &'static str {
        match self {
            Self::LeagueReviewRequested { .. } => "league_review_requested",
            Self::LeagueValidated { .. } => "league_validated",
            Self::LeagueRejected { .. } => "league_rejected",
            Self::LeaguePasswordReset { .. } => "league_password_reset",
            Self::CoachRegistered { .. } => "coach_registered",
            Self::CoachWelcome { .. } => "coach_welcome",
            Self::CoachValidated { .. } => "coach_validated",
            Self::CoachRejected { .. } => "coach_rejected",
            Self::CoachPasswordReset { .. } => "coach_password_reset",
        }
    }

    #[must_use]
    pub fn subject(&self) -> &'static str {
        match self {
            Self::LeagueReviewRequested { .. } => "A league is awaiting review",
            Self::LeagueValidated { .. } | Self::CoachValidated { .. } => {
                "Your account has been validated"
            }
            Self::LeagueRejected { .. } | Self::CoachRejected { .. } => {
                "Your account has been rejected/terminated"
            }
            Self::LeaguePasswordReset { .. } | Self::CoachPasswordReset { .. } => {
                "Your password has been reset"
            }
            Self::CoachRegistered { .. } => "A coach has registered with your league",
            Self::CoachWelcome { .. } => "Your coach account is ready",
        }
    }

    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::LeagueReviewRequested { to, .. }
            | Self::LeagueValidated { to, .. }
            | Self::LeagueRejected { to, .. }
            | Self::LeaguePasswordReset { to, .. }
            | Self::CoachRegistered { to, .. }
            | Self::CoachWelcome { to, .. }
            | Self::CoachValidated { to, .. }
            | Self::CoachRejected { to, .. }
            | Self::CoachPasswordReset { to, .. } => to,
        }
    }

    /// Render the template payload handed to the transport.
    #[must_use]
    pub fn payload_json(&self) -> String {
        let payload = match self {
            Self::LeagueReviewRequested {
                league_name,
                city,
                state,
                contact_name,
                validate_url,
                reject_url,
                ..
            } => json!({
                "league_name": league_name,
                "city": city,
                "state": state,
                "contact_name": contact_name,
                "validate_url": validate_url,
                "reject_url": reject_url,
            }),
            Self::LeagueValidated {
                first_name,
                league_name,
                one_time_password,
                ..
            }
            | Self::CoachValidated {
                first_name,
                league_name,
                one_time_password,
                ..
            }
            | Self::CoachWelcome {
                first_name,
                league_name,
                one_time_password,
                ..
            } => json!({
                "first_name": first_name,
                "league_name": league_name,
                "one_time_password": one_time_password,
            }),
            Self::LeagueRejected {
                first_name,
                league_name,
                ..
            }
            | Self::CoachRejected {
                first_name,
                league_name,
                ..
            } => json!({
                "first_name": first_name,
                "league_name": league_name,
            }),
            Self::LeaguePasswordReset {
                first_name,
                one_time_password,
                ..
            }
            | Self::CoachPasswordReset {
                first_name,
                one_time_password,
                ..
            } => json!({
                "first_name": first_name,
                "one_time_password": one_time_password,
            }),
            Self::CoachRegistered {
                coach_name,
                league_name,
                ..
            } => json!({
                "coach_name": coach_name,
                "league_name": league_name,
            }),
        };
        payload.to_string()
    }
}

/// Email delivery abstraction.
pub trait Notifier: Send + Sync {
    /// Deliver a notification or return an error to have it logged.
    fn send(&self, notification: &Notification) -> Result<()>;
}

/// Local dev sender that logs delivery metadata instead of sending real
/// email. The payload itself is not logged; it may carry a one-time
/// password.
#[derive(Clone, Debug)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            to = %notification.recipient(),
            template = %notification.template(),
            subject = %notification.subject(),
            "email send stub"
        );
        Ok(())
    }
}

/// Post-commit dispatch: the transition already happened, so a delivery
/// failure is logged and swallowed.
pub fn notify(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(err) = notifier.send(notification) {
        error!(
            to = %notification.recipient(),
            template = %notification.template(),
            "failed to send notification: {err:#}"
        );
    }
}
