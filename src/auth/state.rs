//! Authentication state trait and macro.

use super::session::SessionManager;

/// Trait for router state types that can authenticate requests.
pub trait HasAuthBackend {
    fn sessions(&self) -> &SessionManager;
}

/// Implement `HasAuthBackend` for a state struct with a
/// `sessions: Arc<SessionManager>` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub sessions: Arc<SessionManager>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn sessions(&self) -> &$crate::auth::SessionManager {
                &self.sessions
            }
        }
    };
}
