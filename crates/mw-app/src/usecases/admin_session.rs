use std::sync::atomic::{AtomicBool, Ordering};

use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Password-gated administrator session for the current process.
pub struct AdminSession {
    password: String,
    authenticated: AtomicBool,
}

impl AdminSession {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            authenticated: AtomicBool::new(false),
        }
    }

    /// An unset password never authenticates.
    #[tracing::instrument(name = "usecase.admin_session.login", skip_all)]
    pub fn login(&self, candidate: &str) -> bool {
        let accepted = !self.password.is_empty()
            && bool::from(self.password.as_bytes().ct_eq(candidate.as_bytes()));
        if accepted {
            info!("Administrator logged in");
        } else {
            warn!("Rejected administrator login");
        }
        self.authenticated.store(accepted, Ordering::SeqCst);
        accepted
    }

    pub fn logout(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}
