//! Acting Principals
//!
//! Every public operation takes the acting principal explicitly; nothing in
//! this crate reads an ambient "current user". A principal is a capability
//! set: an identity plus the role names granted by the identity provider.

use std::collections::HashSet;

use uuid::Uuid;

/// An authenticated caller of the workflow engine.
pub trait Principal: Send + Sync {
    /// Identity of the caller.
    fn id(&self) -> Uuid;

    /// Role names granted to the caller.
    fn roles(&self) -> &HashSet<String>;
}

/// Plain principal carrying an id and a role set, as handed over by the
/// identity provider.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    user_id: Uuid,
    roles: HashSet<String>,
}

impl AuthenticatedUser {
    pub fn new<I, S>(user_id: Uuid, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl Principal for AuthenticatedUser {
    fn id(&self) -> Uuid {
        self.user_id
    }

    fn roles(&self) -> &HashSet<String> {
        &self.roles
    }
}
