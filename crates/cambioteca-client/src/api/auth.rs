use cambioteca_types::api::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterForm,
    ResetPasswordRequest,
};
use cambioteca_types::models::{Session, User};
use tracing::info;

use super::{ApiClient, file_part};
use crate::error::ApiError;

impl ApiClient {
    /// POST /auth/login/. On success the session store is populated and
    /// subscribers hear about it; the caller only decides where to
    /// navigate, which depends on `is_admin`.
    ///
    /// Unlike every other endpoint, failures here carry their message in
    /// the `error` field; [`ApiError::detail`] already accounts for that.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let req = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let resp: LoginResponse = self.post_json("/auth/login/", &req).await?;
        let user = resp.user.clone();
        self.session().establish(Session {
            access_token: resp.access,
            user: resp.user,
        });
        info!(user_id = user.id, "session established");
        Ok(user)
    }

    /// Drop the session. Purely local: the backend keeps no session state
    /// worth telling about.
    pub fn logout(&self) {
        self.session().clear();
    }

    /// POST /auth/register/ as multipart form data; the avatar file rides
    /// along when present.
    pub async fn register(&self, form: RegisterForm) -> Result<(), ApiError> {
        let mut multipart = reqwest::multipart::Form::new();
        for (name, value) in form.text_fields() {
            multipart = multipart.text(name, value);
        }
        if let Some(avatar) = form.avatar {
            multipart = multipart.part("imagen_perfil", file_part(avatar)?);
        }
        self.post_multipart_unit("/auth/register/", multipart).await
    }

    /// POST /auth/forgot/. Always answers politely, whether or not the
    /// address exists.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let req = ForgotPasswordRequest {
            email: email.to_owned(),
        };
        self.post_unit("/auth/forgot/", &req).await
    }

    /// POST /auth/reset/ with the token from the recovery email.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<(), ApiError> {
        let req = ResetPasswordRequest {
            token: token.to_owned(),
            password: password.to_owned(),
            password2: password_confirm.to_owned(),
        };
        self.post_unit("/auth/reset/", &req).await
    }

    /// POST /auth/change-password/ for the logged-in account.
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        let req = ChangePasswordRequest {
            current: current.to_owned(),
            new_password: new.to_owned(),
        };
        self.post_unit("/auth/change-password/", &req).await
    }
}
