//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! shopmart login -e mona@example.com -p secret1
//! shopmart register -n "Mona Adel" -e mona@example.com -p secret1 -r secret1 --phone 01012345678
//! shopmart whoami
//! shopmart password change --current secret1 --new secret2 --confirm secret2
//! shopmart password reset
//! shopmart logout
//! ```

#![allow(clippy::print_stdout)]

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use shopmart_storefront::Storefront;
use shopmart_storefront::services::{Registration, ResetStep};

use super::CliError;
use crate::session_store::SessionStore;

/// Sign in and remember the session.
pub async fn login(
    storefront: &Storefront,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let session = storefront.auth().login(email, password).await?;
    store.save(&session)?;
    println!("Welcome back, {}!", session.user().name);
    Ok(())
}

/// Sign out and forget the session.
pub fn logout(storefront: &Storefront, store: &SessionStore) -> Result<(), CliError> {
    let was_signed_in = storefront.auth().logout();
    store.clear()?;
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

/// Create an account.
pub async fn register(storefront: &Storefront, form: &Registration) -> Result<(), CliError> {
    let profile = storefront.auth().register(form).await?;
    println!("Account created for {} <{}>.", profile.name, profile.email);
    println!("Run `shopmart login` to sign in.");
    Ok(())
}

/// Show the signed-in shopper.
pub fn whoami(storefront: &Storefront) {
    let Some(session) = storefront.session().current() else {
        println!("Not signed in.");
        return;
    };
    let user = session.user();
    println!("{} ({})", user.name, user.role);
    println!("  id:    {}", user.id);
    if let Some(email) = &user.email {
        println!("  email: {email}");
    }
    if let Some(expires_at) = session.expires_at() {
        println!("  until: {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
}

/// Change the password; the shopper is signed out afterwards.
pub async fn change_password(
    storefront: &Storefront,
    store: &SessionStore,
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<(), CliError> {
    storefront
        .auth()
        .change_password(current, new, confirm)
        .await?;
    store.clear()?;
    println!("Password changed. Please sign in again.");
    Ok(())
}

/// Walk through the password reset wizard on the terminal.
pub async fn reset_password(storefront: &Storefront) -> Result<(), CliError> {
    let auth = storefront.auth();
    let mut wizard = auth.password_reset();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    while wizard.step() != ResetStep::Done {
        let outcome = match wizard.step() {
            ResetStep::RequestCode => {
                let email = prompt(&mut input, "Email").await?;
                wizard.request_code(&email).await
            }
            ResetStep::VerifyCode => {
                let code = prompt(&mut input, "Code from your email (blank to go back)").await?;
                if code.is_empty() {
                    wizard.back();
                    continue;
                }
                wizard.verify_code(&code).await
            }
            ResetStep::NewPassword => {
                let password = prompt(&mut input, "New password").await?;
                wizard.set_new_password(&password).await
            }
            ResetStep::Done => break,
        };
        if let Err(e) = outcome {
            println!("✗ {e}");
        }
    }

    println!("Password reset. Run `shopmart login` with your new password.");
    Ok(())
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String, CliError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{label}: ").as_bytes()).await?;
    stdout.flush().await?;
    let line = input.next_line().await?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input closed")
    })?;
    Ok(line.trim().to_string())
}
