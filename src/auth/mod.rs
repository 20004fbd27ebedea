pub mod gateway;
pub mod handle;
pub mod implicit;
pub mod loopback;
pub mod session_store;

pub use gateway::{AuthGateway, AuthState};
pub use handle::{ClientHandle, TokenHandle};
pub use implicit::{LoginRequest, OAuthConfig};
pub use session_store::SessionStore;
