use uuid::Uuid;

/// Authenticated caller, resolved by the transport layer and handed to
/// every comment mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self { Self { user_id } }

    pub fn owns(&self, author: Uuid) -> bool { self.user_id == author }
}
