use tracing::warn;

/// Side effect fired when the session can no longer be renewed.
///
/// A front end uses this to send the user back to its login screen. It is a
/// notification, not an error path: the failing call still returns
/// [`ClientError::SessionExpired`](crate::error::ClientError::SessionExpired).
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator for headless use: records the redirect in the log.
pub struct LoggingNavigator {
    login_route: String,
}

impl LoggingNavigator {
    pub fn new(login_route: impl Into<String>) -> Self {
        LoggingNavigator {
            login_route: login_route.into(),
        }
    }
}

impl Navigator for LoggingNavigator {
    fn redirect_to_login(&self) {
        warn!(
            login_route = self.login_route.as_str(),
            "session expired, redirecting to login"
        );
    }
}
