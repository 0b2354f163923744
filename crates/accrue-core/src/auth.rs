//! [`Authorizer`] implementations.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::traits::Authorizer;
use crate::types::ParticipantId;

/// Fixed set of administrators, editable at runtime.
#[derive(Debug, Default)]
pub struct AdminList {
    admins: RwLock<HashSet<ParticipantId>>,
}

impl AdminList {
    pub fn new(admins: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            admins: RwLock::new(admins.into_iter().collect()),
        }
    }

    /// Returns `true` if `admin` was newly added.
    pub fn grant(&self, admin: ParticipantId) -> bool {
        self.admins.write().insert(admin)
    }

    /// Returns `true` if `admin` was present.
    pub fn revoke(&self, admin: &ParticipantId) -> bool {
        self.admins.write().remove(admin)
    }
}

impl Authorizer for AdminList {
    fn is_authorized(&self, caller: &ParticipantId) -> bool {
        self.admins.read().contains(caller)
    }
}
