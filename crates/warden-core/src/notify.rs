//! Notification port: the outbound mail capability the account service
//! fires and forgets through.

use crate::error::WardenResult;
use crate::models::user::User;

/// Sends account emails on behalf of the account service.
///
/// `token` is the raw single-use credential; the record only carries its
/// digest. Implementations own delivery and any retry policy.
pub trait Notifier: Send + Sync + 'static {
    fn send_verification(
        &self,
        user: &User,
        token: &str,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    fn send_password_reset(
        &self,
        user: &User,
        token: &str,
    ) -> impl Future<Output = WardenResult<()>> + Send;
}
