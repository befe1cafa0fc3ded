//! Password reset wizard.
//!
//! Three linear steps: request a code by email, verify the code, choose a
//! new password. A step only advances when the remote API accepts it. From
//! code verification the shopper may go back to re-enter the email.

use tracing::{info, instrument};

use shopmart_core::{Email, validation};

use super::AuthError;
use crate::api::ShopClient;

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// Waiting for the account email.
    RequestCode,
    /// Code sent; waiting for the shopper to enter it.
    VerifyCode,
    /// Code accepted; waiting for the new password.
    NewPassword,
    /// Password changed.
    Done,
}

impl ResetStep {
    /// 1-based position for display, `None` once finished.
    #[must_use]
    pub const fn number(self) -> Option<u8> {
        match self {
            Self::RequestCode => Some(1),
            Self::VerifyCode => Some(2),
            Self::NewPassword => Some(3),
            Self::Done => None,
        }
    }
}

/// One run of the reset wizard.
#[derive(Debug)]
pub struct PasswordReset<'a> {
    client: &'a ShopClient,
    step: ResetStep,
    email: Option<Email>,
}

impl<'a> PasswordReset<'a> {
    pub(super) const fn new(client: &'a ShopClient) -> Self {
        Self {
            client,
            step: ResetStep::RequestCode,
            email: None,
        }
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> ResetStep {
        self.step
    }

    /// Email the code was sent to.
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    fn expect_step(&self, expected: ResetStep) -> Result<(), AuthError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(AuthError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// Step 1: send a reset code to the account email.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid email, an unknown account, or when
    /// called at another step.
    #[instrument(skip(self))]
    pub async fn request_code(&mut self, email: &str) -> Result<(), AuthError> {
        self.expect_step(ResetStep::RequestCode)?;
        let email = validation::email(email)?;

        self.client.forgot_password(email.as_str()).await?;

        info!(email = %email, "Reset code sent");
        self.email = Some(email);
        self.step = ResetStep::VerifyCode;
        Ok(())
    }

    /// Step 2: check the emailed code.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or rejected code, or when called at
    /// another step.
    #[instrument(skip(self, code))]
    pub async fn verify_code(&mut self, code: &str) -> Result<(), AuthError> {
        self.expect_step(ResetStep::VerifyCode)?;
        let code = validation::reset_code(code)?;

        self.client.verify_reset_code(&code).await?;

        self.step = ResetStep::NewPassword;
        Ok(())
    }

    /// Step 3: set the new password.
    ///
    /// # Errors
    ///
    /// Returns an error for a short password, a remote rejection, or when
    /// called at another step.
    #[instrument(skip(self, new_password))]
    pub async fn set_new_password(&mut self, new_password: &str) -> Result<(), AuthError> {
        self.expect_step(ResetStep::NewPassword)?;
        validation::password("new password", new_password)?;
        let Some(email) = self.email.as_ref() else {
            return Err(AuthError::WrongStep {
                expected: ResetStep::RequestCode,
                actual: self.step,
            });
        };

        self.client
            .reset_password(email.as_str(), new_password)
            .await?;

        info!(email = %email, "Password reset");
        self.step = ResetStep::Done;
        Ok(())
    }

    /// Return from code verification to email entry. Returns `false` (and
    /// stays put) from any other step.
    pub fn back(&mut self) -> bool {
        if self.step != ResetStep::VerifyCode {
            return false;
        }
        self.step = ResetStep::RequestCode;
        true
    }
}
