use axum::{
    Json,
    extract::{Query, State},
};
use cambioteca_types::models::{Comuna, Genre, PublicConfig, Region};
use serde::Deserialize;

use crate::state::AppState;

pub async fn regions(State(state): State<AppState>) -> Json<Vec<Region>> {
    Json(state.market().regions.clone())
}

#[derive(Debug, Deserialize)]
pub struct ComunaQuery {
    pub region: i64,
}

pub async fn comunas(
    State(state): State<AppState>,
    Query(query): Query<ComunaQuery>,
) -> Json<Vec<Comuna>> {
    let market = state.market();
    Json(
        market
            .comunas
            .iter()
            .filter(|c| c.region_id == query.region)
            .cloned()
            .collect(),
    )
}

pub async fn genres(State(state): State<AppState>) -> Json<Vec<Genre>> {
    Json(state.market().genres.clone())
}

pub async fn public_config() -> Json<PublicConfig> {
    Json(PublicConfig {
        maps_api_key: Some("testkit-maps-key".into()),
    })
}
