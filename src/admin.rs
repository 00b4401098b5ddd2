//! Admin gate: a shared static secret.
//!
//! Hides the editing controls from a casual driver. It is not an
//! authentication mechanism and has no lockout.

#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: String,
}

impl AdminGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn check(&self, input: &str) -> bool {
        input == self.secret
    }
}
