//! OAuth2 authorization-code login and token lifecycle.

pub mod callback;
pub mod endpoint;
pub mod flow;
pub mod manager;
pub mod session;
pub mod store;

pub use callback::{CallbackListener, CallbackParams, RedirectTarget};
pub use endpoint::TokenEndpoint;
pub use flow::{AuthorizationFlow, BrowserPresenter, FlowState, UrlPresenter};
pub use manager::{Authorizer, TokenManager};
pub use session::AuthorizationSession;
pub use store::{CredentialStore, TokenRecord};
