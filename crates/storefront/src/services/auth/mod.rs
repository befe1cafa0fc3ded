//! Authentication service.
//!
//! Sign-in, sign-up, password change and the password reset wizard. Every
//! form is validated locally before the remote API sees it. Signing in and
//! out goes through the [`SessionSignal`], which the cart and wishlist
//! synchronizers follow on their own.

mod error;
mod reset;

pub use error::AuthError;
pub use reset::{PasswordReset, ResetStep};

use tracing::{info, instrument};

use shopmart_core::validation;

use crate::api::{ChangePasswordRequest, ShopClient, SignUpRequest, UserProfile};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::session::{Session, SessionSignal};

/// Sign-up form as entered by the shopper.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub re_password: String,
    pub phone: String,
}

/// Authentication service.
///
/// Borrows the shared client and session signal for the duration of a call.
pub struct AuthService<'a> {
    client: &'a ShopClient,
    session: &'a SessionSignal,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(client: &'a ShopClient, session: &'a SessionSignal) -> Self {
        Self { client, session }
    }

    /// Sign in with email and password and publish the new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input and
    /// `AuthError::InvalidCredentials` when the remote API refuses them.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = validation::email(email)?;
        validation::password("password", password)?;

        let response = self.client.sign_in(email.as_str(), password).await?;
        let session = Session::from_token(response.token, Some(response.user.email))?;

        set_sentry_user(&session.user().id, session.user().email.as_deref());
        self.session.sign_in(session.clone());
        info!(user_id = %session.user().id, "Signed in");

        Ok(session)
    }

    /// Create an account. The shopper signs in separately afterwards.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for an invalid form and
    /// `AuthError::Rejected` when the remote API refuses it (for example an
    /// email that is already registered).
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<UserProfile, AuthError> {
        let name = validation::name(&form.name)?;
        let email = validation::email(&form.email)?;
        validation::strong_password(&form.password)?;
        validation::confirmation(&form.password, &form.re_password)?;
        let phone = validation::phone(&form.phone)?;

        let request = SignUpRequest {
            name,
            email: email.into_inner(),
            password: form.password.clone(),
            re_password: form.re_password.clone(),
            phone,
        };
        let response = self.client.sign_up(&request).await?;
        info!("Account created");

        Ok(response.user)
    }

    /// Change the signed-in shopper's password, then sign out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without a session,
    /// `AuthError::Validation` for an invalid form, and the remote rejection
    /// when the current password is wrong.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let token = self.session.token().ok_or(AuthError::NotSignedIn)?;

        if current_password.is_empty() {
            return Err(validation::ValidationError::Required {
                field: "current password",
            }
            .into());
        }
        validation::password("new password", new_password)?;
        validation::confirmation(new_password, confirm)?;

        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            password: new_password.to_string(),
            re_password: confirm.to_string(),
        };
        self.client.change_password(&token, &request).await?;
        info!("Password changed");

        self.logout();
        Ok(())
    }

    /// Sign out. Returns `true` if someone was signed in.
    pub fn logout(&self) -> bool {
        clear_sentry_user();
        self.session.sign_out()
    }

    /// Start the three-step password reset wizard.
    #[must_use]
    pub const fn password_reset(&self) -> PasswordReset<'a> {
        PasswordReset::new(self.client)
    }
}
