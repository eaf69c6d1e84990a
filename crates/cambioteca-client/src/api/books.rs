use serde::Deserialize;

use cambioteca_types::api::{
    BookFilters, BookImageUpload, CreateBookRequest, ReportBookRequest, UpdateBookRequest,
};
use cambioteca_types::models::{Book, BookImage};

use super::{ApiClient, file_part};
use crate::error::ApiError;

/// Some deployments paginate the catalog, some answer with a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum BookListing {
    Plain(Vec<Book>),
    Paginated { results: Vec<Book> },
}

impl From<BookListing> for Vec<Book> {
    fn from(listing: BookListing) -> Self {
        match listing {
            BookListing::Plain(books) => books,
            BookListing::Paginated { results } => results,
        }
    }
}

impl ApiClient {
    /// GET /libros/ with the filter's query parameters.
    pub async fn books(&self, filters: &BookFilters) -> Result<Vec<Book>, ApiError> {
        let listing: BookListing = self
            .get_json_query("/libros/", &filters.to_params())
            .await?;
        Ok(listing.into())
    }

    /// GET /libros/latest/.
    pub async fn latest_books(&self) -> Result<Vec<Book>, ApiError> {
        let listing: BookListing = self.get_json("/libros/latest/").await?;
        Ok(listing.into())
    }

    /// GET /libros/populares/.
    pub async fn popular_books(&self) -> Result<Vec<Book>, ApiError> {
        let listing: BookListing = self.get_json("/libros/populares/").await?;
        Ok(listing.into())
    }

    /// GET /libros/{id}/.
    pub async fn book(&self, id: i64) -> Result<Book, ApiError> {
        self.get_json(&format!("/libros/{}/", id)).await
    }

    /// GET /libros/{id}/images/, ordered by position.
    pub async fn book_images(&self, id: i64) -> Result<Vec<BookImage>, ApiError> {
        self.get_json(&format!("/libros/{}/images/", id)).await
    }

    /// GET /books/mine/?user_id=N. The one path the backend names in
    /// English; kept verbatim.
    pub async fn my_books(&self, user_id: i64) -> Result<Vec<Book>, ApiError> {
        let listing: BookListing = self
            .get_json_query("/books/mine/", &[("user_id", user_id.to_string())])
            .await?;
        Ok(listing.into())
    }

    /// POST /libros/create/. Returns the stored book; its id is what the
    /// image uploads that follow hang off.
    pub async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, ApiError> {
        self.post_json("/libros/create/", req).await
    }

    /// PATCH /libros/{id}/update/ with only the changed fields.
    pub async fn update_book(&self, id: i64, req: &UpdateBookRequest) -> Result<(), ApiError> {
        self.patch_unit(&format!("/libros/{}/update/", id), req)
            .await
    }

    /// DELETE /libros/{id}/delete/.
    pub async fn delete_book(&self, id: i64) -> Result<(), ApiError> {
        self.delete_unit(&format!("/libros/{}/delete/", id)).await
    }

    /// POST /libros/{id}/images/upload/. The backend's form parser wants
    /// the cover flag as "1"/"0".
    pub async fn upload_book_image(
        &self,
        book_id: i64,
        upload: BookImageUpload,
    ) -> Result<(), ApiError> {
        let form = reqwest::multipart::Form::new()
            .part("image", file_part(upload.image)?)
            .text("is_portada", if upload.is_cover { "1" } else { "0" })
            .text("orden", upload.position.to_string());
        self.post_multipart_unit(&format!("/libros/{}/images/upload/", book_id), form)
            .await
    }

    /// POST /libros/{id}/reportar/.
    pub async fn report_book(&self, book_id: i64, req: &ReportBookRequest) -> Result<(), ApiError> {
        self.post_unit(&format!("/libros/{}/reportar/", book_id), req)
            .await
    }
}
