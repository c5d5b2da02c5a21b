use serde::{Deserialize, Serialize};

/// Requester identity as supplied by the upstream identity provider.
/// Opaque to this service: nothing here is validated beyond presence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}
