use cambioteca_types::api::{ToggleFavoriteRequest, ToggleFavoriteResponse};
use cambioteca_types::models::Book;

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// GET /favoritos/?user_id=N: the full books, not just ids.
    pub async fn favorites(&self, user_id: i64) -> Result<Vec<Book>, ApiError> {
        self.get_json_query("/favoritos/", &[("user_id", user_id.to_string())])
            .await
    }

    /// The backend has no ids-only endpoint, so this derives them from the
    /// full listing.
    pub async fn favorite_ids(&self, user_id: i64) -> Result<Vec<i64>, ApiError> {
        let books = self.favorites(user_id).await?;
        Ok(books.into_iter().map(|b| b.id).collect())
    }

    /// POST /favoritos/{bookId}/toggle/: one endpoint for both directions.
    /// The answer says which way the toggle went.
    pub async fn toggle_favorite(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> Result<ToggleFavoriteResponse, ApiError> {
        let req = ToggleFavoriteRequest { user_id };
        self.post_json(&format!("/favoritos/{}/toggle/", book_id), &req)
            .await
    }
}
