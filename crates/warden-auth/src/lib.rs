//! Warden Auth: the account lifecycle state machine, Argon2id password
//! codec, opaque and JWT tokens, and the role-based access policy.

pub mod config;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod nickname;
pub mod password;
pub mod policy;
pub mod service;
pub mod token;
pub mod validation;

pub use config::{AuthConfig, HashingParams, PasswordPolicy};
pub use email::{EmailNotifier, MailTransport, OutgoingEmail, TracingTransport};
pub use error::AuthError;
pub use policy::{AuthenticatedCaller, RoleGuard, require_role};
pub use service::AccountService;
