use uuid::Uuid;

use super::role::Role;

/// The authenticated side of an [`Actor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }
}

/// The caller of an action, fixed for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Authenticated(Identity),
}

impl Actor {
    pub fn authenticated(user_id: Uuid, username: impl Into<String>, role: Role) -> Self {
        Actor::Authenticated(Identity::new(user_id, username, role))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Actor::Authenticated(identity) => Some(identity),
            Actor::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.identity().map(|identity| identity.role)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.identity().map(|identity| identity.user_id)
    }
}
