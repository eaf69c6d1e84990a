use cambioteca_types::models::{Comuna, Genre, PublicConfig, Region};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    /// GET /catalog/regiones/.
    pub async fn regions(&self) -> Result<Vec<Region>, ApiError> {
        self.get_json("/catalog/regiones/").await
    }

    /// GET /catalog/comunas/?region=N. The registration form re-queries
    /// this every time the region dropdown changes.
    pub async fn comunas(&self, region_id: i64) -> Result<Vec<Comuna>, ApiError> {
        self.get_json_query("/catalog/comunas/", &[("region", region_id.to_string())])
            .await
    }

    /// GET /catalog/generos/.
    pub async fn genres(&self) -> Result<Vec<Genre>, ApiError> {
        self.get_json("/catalog/generos/").await
    }

    /// GET /public/config/. Unauthenticated; ships the map API key.
    pub async fn public_config(&self) -> Result<PublicConfig, ApiError> {
        self.get_json("/public/config/").await
    }
}
