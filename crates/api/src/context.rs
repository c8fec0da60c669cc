use bazaar_auth::{Actor, Role};
use bazaar_core::UserId;
use bazaar_parties::{User, UserProfile};

/// The authenticated account for a request.
///
/// Inserted by the auth middleware after the gate has resolved an active
/// user; handlers only ever see the profile view, never the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    profile: UserProfile,
}

impl CurrentUser {
    pub fn new(user: &User) -> Self {
        Self {
            profile: user.profile(),
        }
    }

    pub fn id(&self) -> UserId {
        self.profile.id
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.profile.id, self.profile.role)
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}
