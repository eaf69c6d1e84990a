use cambioteca_types::api::{AvatarResponse, FilePart, UpdateProfileRequest};
use cambioteca_types::models::{Book, ExchangeRecord, User, UserRating, UserSummary};

use super::{ApiClient, file_part};
use crate::error::ApiError;

impl ApiClient {
    /// GET /users/{id}/summary/: account plus the profile-page metrics.
    pub async fn user_summary(&self, id: i64) -> Result<UserSummary, ApiError> {
        self.get_json(&format!("/users/{}/summary/", id)).await
    }

    /// GET /users/{id}/profile/.
    pub async fn user_profile(&self, id: i64) -> Result<User, ApiError> {
        self.get_json(&format!("/users/{}/profile/", id)).await
    }

    /// PATCH /users/{id}/. When the edited account is the logged-in one,
    /// the session copy is refreshed too, so subscribed views re-render.
    pub async fn update_profile(
        &self,
        id: i64,
        req: &UpdateProfileRequest,
    ) -> Result<User, ApiError> {
        let user: User = self.patch_json(&format!("/users/{}/", id), req).await?;
        if self.session().user_id() == Some(id) {
            self.session().update_user(user.clone());
        }
        Ok(user)
    }

    /// PATCH /users/{id}/avatar/ as multipart. The session keeps the new
    /// avatar path so the navbar picture flips without a re-login.
    pub async fn update_avatar(&self, id: i64, avatar: FilePart) -> Result<String, ApiError> {
        let form = reqwest::multipart::Form::new().part("imagen_perfil", file_part(avatar)?);
        let resp: AvatarResponse = self
            .patch_multipart(&format!("/users/{}/avatar/", id), form)
            .await?;
        if self.session().user_id() == Some(id) {
            self.session().update_avatar(resp.avatar_url.clone());
        }
        Ok(resp.avatar_url)
    }

    /// GET /users/{id}/books/: the public listing on a profile.
    pub async fn user_books(&self, id: i64) -> Result<Vec<Book>, ApiError> {
        self.get_json(&format!("/users/{}/books/", id)).await
    }

    /// GET /users/{id}/ratings/: received and given, tagged by kind.
    pub async fn user_ratings(&self, id: i64) -> Result<Vec<UserRating>, ApiError> {
        self.get_json(&format!("/users/{}/ratings/", id)).await
    }

    /// GET /users/{id}/intercambios/: the exchange history rows.
    pub async fn user_exchanges(&self, id: i64) -> Result<Vec<ExchangeRecord>, ApiError> {
        self.get_json(&format!("/users/{}/intercambios/", id)).await
    }
}
