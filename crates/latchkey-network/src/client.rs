use latchkey_core::{CardId, DeviceIdentity};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Answer of the remote authority for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCheck {
    /// The authority recognises the card for this device
    Authorized,

    /// The authority answered and refused the card
    NotAuthorized,

    /// No usable answer: transport failure, timeout, non-200 status or an
    /// unparsable body
    Unreachable,
}

impl AccessCheck {
    pub fn is_authorized(self) -> bool {
        matches!(self, AccessCheck::Authorized)
    }
}

impl fmt::Display for AccessCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            AccessCheck::Authorized => "authorized",
            AccessCheck::NotAuthorized => "not-authorized",
            AccessCheck::Unreachable => "unreachable",
        };
        f.write_str(label)
    }
}

/// Stateless request/response contract with the remote authority.
///
/// Implementations never fail: every error collapses into
/// [`AccessCheck::Unreachable`]. The returned future is `Send` so a check
/// can be spawned as a background task.
pub trait AuthorityClient: Send + Sync + 'static {
    fn check_access(
        &self,
        device: &DeviceIdentity,
        card: &CardId,
    ) -> impl Future<Output = AccessCheck> + Send;
}

impl<T: AuthorityClient> AuthorityClient for Arc<T> {
    fn check_access(
        &self,
        device: &DeviceIdentity,
        card: &CardId,
    ) -> impl Future<Output = AccessCheck> + Send {
        T::check_access(self, device, card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_authorized_is_authorized() {
        assert!(AccessCheck::Authorized.is_authorized());
        assert!(!AccessCheck::NotAuthorized.is_authorized());
        assert!(!AccessCheck::Unreachable.is_authorized());
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessCheck::NotAuthorized.to_string(), "not-authorized");
    }
}
