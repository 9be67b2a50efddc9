//! Login, current user and logout.

use crate::session::{ApiClient, SessionEvent};
use crate::transport::ApiRequest;
use gymdesk_core::error::GymResult;
use gymdesk_core::{Credentials, Envelope, LoginResponse, User};

impl ApiClient {
    /// Validates the form, exchanges credentials for tokens and caches the user.
    pub async fn login(&self, credentials: &Credentials) -> GymResult<LoginResponse> {
        credentials.validate()?;

        let request = ApiRequest::post("/auth/login").json(credentials)?;
        let resp = self.send_anonymous(&request).await?;
        let login = resp.json::<Envelope<LoginResponse>>()?.data;

        self.tokens()
            .set_tokens(&login.access_token, &login.refresh_token)?;
        if let Some(user) = &login.user {
            self.tokens().set_user(user)?;
        }

        tracing::info!(email = %credentials.email, "logged in");
        self.publish(SessionEvent::LoggedIn {
            user: login.user.clone(),
        });
        Ok(login)
    }

    pub async fn me(&self) -> GymResult<User> {
        let user: User = self.get_data("/auth/me").await?;
        self.tokens().set_user(&user)?;
        Ok(user)
    }

    /// Local logout: forgets tokens and the cached user.
    pub fn logout(&self) -> GymResult<()> {
        self.tokens().clear_tokens()?;
        tracing::info!("logged out");
        self.publish(SessionEvent::LoggedOut);
        Ok(())
    }
}
