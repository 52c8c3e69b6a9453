//! Email-backed [`Notifier`]: composes account messages and hands them
//! to a [`MailTransport`]. Delivery itself is the transport's concern.

use tracing::{debug, info};
use warden_core::error::WardenResult;
use warden_core::models::user::User;
use warden_core::notify::Notifier;

/// A fully composed outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can put an [`OutgoingEmail`] on the wire.
pub trait MailTransport: Send + Sync + 'static {
    fn send(&self, email: OutgoingEmail) -> impl Future<Output = WardenResult<()>> + Send;
}

/// Logs messages instead of sending them. Useful in development; the body,
/// links included, is logged at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingTransport;

impl MailTransport for TracingTransport {
    async fn send(&self, email: OutgoingEmail) -> WardenResult<()> {
        info!(to = %email.to, subject = %email.subject, "Outgoing email (not delivered)");
        debug!(to = %email.to, body = %email.body, "Outgoing email body");
        Ok(())
    }
}

pub struct EmailNotifier<T: MailTransport> {
    transport: T,
    base_url: String,
}

impl<T: MailTransport> EmailNotifier<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_email(&self, user: &User, token: &str) -> OutgoingEmail {
        let link = format!("{}/verify-email/{}/{}", self.base_url, user.id, token);
        OutgoingEmail {
            to: user.email.clone(),
            subject: "Verify Your Account".into(),
            body: format!(
                "Hello {},\n\nPlease confirm your email address by opening the link below:\n\n\
                 {link}\n",
                display_name(user)
            ),
        }
    }

    pub fn password_reset_email(&self, user: &User, token: &str) -> OutgoingEmail {
        let link = format!("{}/reset-password/{}/{}", self.base_url, user.id, token);
        OutgoingEmail {
            to: user.email.clone(),
            subject: "Password Reset Instructions".into(),
            body: format!(
                "Hello {},\n\nA password reset was requested for your account. \
                 If this was you, open the link below:\n\n{link}\n\n\
                 If not, you can ignore this message.\n",
                display_name(user)
            ),
        }
    }
}

fn display_name(user: &User) -> &str {
    user.first_name.as_deref().unwrap_or(&user.nickname)
}

impl<T: MailTransport> Notifier for EmailNotifier<T> {
    async fn send_verification(&self, user: &User, token: &str) -> WardenResult<()> {
        self.transport.send(self.verification_email(user, token)).await
    }

    async fn send_password_reset(&self, user: &User, token: &str) -> WardenResult<()> {
        self.transport.send(self.password_reset_email(user, token)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use uuid::Uuid;
    use warden_core::models::user::UserRole;

    use super::*;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutgoingEmail>>);

    impl MailTransport for std::sync::Arc<Outbox> {
        async fn send(&self, email: OutgoingEmail) -> WardenResult<()> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            nickname: "tester".into(),
            password_hash: String::new(),
            role: UserRole::User,
            first_name: Some("Test".into()),
            last_name: None,
            bio: None,
            profile_picture_url: None,
            verification_token: None,
            is_verified: false,
            password_reset_token: None,
            password_reset_expires_at: None,
            failed_login_attempts: 0,
            is_locked: false,
            locked_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn verification_email_is_composed_and_sent() {
        let outbox = std::sync::Arc::new(Outbox::default());
        let notifier = EmailNotifier::new(outbox.clone(), "http://example.com/");
        let user = user();

        notifier.send_verification(&user, "abc123").await.unwrap();

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "test@example.com");
        assert_eq!(sent[0].subject, "Verify Your Account");
        assert!(
            sent[0]
                .body
                .contains(&format!("http://example.com/verify-email/{}/abc123", user.id))
        );
        assert!(sent[0].body.contains("Hello Test"));
    }

    #[tokio::test]
    async fn reset_email_uses_reset_link() {
        let outbox = std::sync::Arc::new(Outbox::default());
        let notifier = EmailNotifier::new(outbox.clone(), "http://example.com");
        let mut user = user();
        user.first_name = None;

        notifier.send_password_reset(&user, "tok").await.unwrap();

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent[0].subject, "Password Reset Instructions");
        assert!(sent[0].body.contains("/reset-password/"));
        assert!(sent[0].body.contains("Hello tester"));
    }
}
