pub mod permissions;

pub use permissions::PermissionStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub permissions: PermissionStore,
}

impl AppState {
    pub fn new(permissions: PermissionStore) -> Self {
        Self { permissions }
    }
}
