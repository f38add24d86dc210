//! Account registration, login, and profile maintenance.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use feira_common::{classify, RemoteError};
use feira_domain::{FeiraError, User, UserRole, USERS_TABLE};

use crate::api::client::StoreClient;
use crate::errors::IntoFeiraError;

/// Authenticated identity as the auth endpoints report it.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Uuid,
}

/// Subset of the token grant response we care about.
#[derive(Debug, Deserialize)]
struct Session {
    user: AuthUser,
}

/// Signup responses carry the user at the top level.
#[derive(Debug, Deserialize)]
struct SignupResponse {
    id: Uuid,
    email: String,
}

/// Registration, login, and profile updates against the backend.
pub struct AuthService {
    client: Arc<StoreClient>,
}

impl AuthService {
    pub fn new(client: Arc<StoreClient>) -> Self {
        Self { client }
    }

    /// Creates the credential and the matching profile row.
    ///
    /// A duplicate email fails on the credential step and surfaces the
    /// friendly classification, so no half-created profile is left behind.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: UserRole,
    ) -> Result<User, FeiraError> {
        let signup: SignupResponse = self
            .client
            .auth_post(
                "auth/v1/signup",
                &[],
                json!({ "email": email, "password": password }),
            )
            .await
            .map_err(auth_error)?;

        info!(user_id = %signup.id, "account created, inserting profile");

        let profile = json!({
            "id": signup.id,
            "email": signup.email,
            "name": name,
            "user_type": role,
        });
        self.client
            .insert_returning::<User, _>(USERS_TABLE, &profile)
            .await
            .into_result()
            .map_err(|e| e.into_feira())
    }

    /// Exchanges credentials for a session and loads the profile row.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, FeiraError> {
        let session: Session = self
            .client
            .auth_post(
                "auth/v1/token",
                &[("grant_type", "password")],
                json!({ "email": email, "password": password }),
            )
            .await
            .map_err(auth_error)?;

        let user_id = session.user.id.to_string();
        let result = self
            .client
            .select_one::<User>(USERS_TABLE, "id", &user_id)
            .await;
        match result.into_result() {
            Ok(user) => Ok(user),
            Err(err) => {
                warn!(user_id = %session.user.id, error = %err, "session valid but profile load failed");
                Err(err.into_feira())
            }
        }
    }

    /// Ends the current session. A failed logout is reported but the
    /// caller is expected to drop local state regardless.
    pub async fn logout(&self) -> Result<(), FeiraError> {
        self.client
            .auth_post_empty("auth/v1/logout")
            .await
            .map_err(auth_error)
    }

    /// Updates the display name and photo on the profile row.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: &str,
        photo_url: Option<&str>,
    ) -> Result<(), FeiraError> {
        let patch = json!({ "name": name, "photo_url": photo_url });
        self.client
            .update_by_id(USERS_TABLE, user_id, &patch)
            .await
            .error
            .map_or(Ok(()), |err| Err(err.into_feira()))
    }
}

/// Auth endpoint failures always become [`FeiraError::Auth`] with the
/// friendly classified message, whatever the raw status was.
fn auth_error(err: RemoteError) -> FeiraError {
    FeiraError::Auth(classify(Some(&err)))
}
