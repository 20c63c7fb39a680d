use crate::cache_validator::CachedPayload;
use crate::config::Config;
use crate::credito;
use crate::db_storage::{CarteraStorage, RiesgoStorage};
use crate::errors::AppError;
use crate::models::*;
use crate::riesgo;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Cache of computed credit analyses, keyed by client id.
    /// Entries are sealed with a digest and discarded on mismatch.
    pub credito_cache: Cache<String, String>,
}

fn credito_cache_key(cliente_id: Uuid) -> String {
    format!("credito:{}", cliente_id)
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-custodia-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/clientes/:id/credito
///
/// Computes the credit analysis for a client, serving a cached copy when one
/// is still fresh. 404 when the client does not exist: there is no analysis
/// to show, which callers render as "no data" rather than an error state.
pub async fn obtener_credito_cliente(
    State(state): State<Arc<AppState>>,
    Path(cliente_id): Path<Uuid>,
) -> Result<Json<ClienteCreditoAnalisis>, AppError> {
    let cache_key = credito_cache_key(cliente_id);

    if let Some(sealed) = state.credito_cache.get(&cache_key).await {
        if let Some(payload) = CachedPayload::open(&sealed) {
            if let Ok(analisis) = serde_json::from_str::<ClienteCreditoAnalisis>(&payload) {
                tracing::debug!("Credit analysis cache HIT for {}", cliente_id);
                return Ok(Json(analisis));
            }
        }
        // Corrupt entry; drop it and recompute
        state.credito_cache.invalidate(&cache_key).await;
    }

    let analisis = credito::analizar_cliente(&state.db, cliente_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cliente {} not found", cliente_id)))?;

    if let Ok(payload) = serde_json::to_string(&analisis) {
        state
            .credito_cache
            .insert(cache_key, CachedPayload::seal(payload))
            .await;
    }

    Ok(Json(analisis))
}

/// GET /api/v1/clientes/:id/facturas
///
/// The non-cancelled invoice set the credit analysis is built from.
pub async fn listar_facturas_cliente(
    State(state): State<Arc<AppState>>,
    Path(cliente_id): Path<Uuid>,
) -> Result<Json<Vec<Factura>>, AppError> {
    let storage = CarteraStorage::new(state.db.clone());

    if storage.fetch_cliente(cliente_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Cliente {} not found",
            cliente_id
        )));
    }

    let facturas = storage.fetch_facturas(cliente_id).await?;
    Ok(Json(facturas))
}

/// GET /api/v1/clientes/:id/pagos
///
/// Most recent applied payments for a client.
pub async fn listar_pagos_cliente(
    State(state): State<Arc<AppState>>,
    Path(cliente_id): Path<Uuid>,
) -> Result<Json<Vec<Pago>>, AppError> {
    let storage = CarteraStorage::new(state.db.clone());

    if storage.fetch_cliente(cliente_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Cliente {} not found",
            cliente_id
        )));
    }

    let pagos = storage.fetch_pagos_aplicados(cliente_id).await?;
    Ok(Json(pagos))
}

/// POST /api/v1/clientes
///
/// Creates a client. `nombre` is required; `rfc` and `limite_credito` are
/// validated when present.
pub async fn crear_cliente(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<NuevoClienteRequest>,
) -> Result<(StatusCode, Json<Cliente>), AppError> {
    validar_token_api(&state, &headers)?;

    if request.nombre.trim().is_empty() {
        return Err(AppError::BadRequest("nombre is required".to_string()));
    }
    if let Some(ref rfc) = request.rfc {
        if !credito::es_rfc_valido(rfc) {
            return Err(AppError::BadRequest(format!("invalid RFC: {}", rfc)));
        }
    }
    validar_limite(request.limite_credito)?;
    if matches!(request.dias_credito, Some(d) if d < 0) {
        return Err(AppError::BadRequest(
            "dias_credito cannot be negative".to_string(),
        ));
    }

    let storage = CarteraStorage::new(state.db.clone());
    let cliente = storage.insertar_cliente(&request).await?;

    tracing::info!("Created client {} ({})", cliente.id, cliente.nombre);
    Ok((StatusCode::CREATED, Json(cliente)))
}

/// PUT /api/v1/clientes/:id/limite-credito
///
/// Sets or clears the credit ceiling and invalidates the client's cached
/// analysis so the next fetch reflects the new limit.
pub async fn actualizar_limite_credito(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(cliente_id): Path<Uuid>,
    Json(request): Json<LimiteCreditoRequest>,
) -> Result<Json<Cliente>, AppError> {
    validar_token_api(&state, &headers)?;
    validar_limite(request.limite_credito)?;

    let storage = CarteraStorage::new(state.db.clone());
    let cliente = storage
        .actualizar_limite_credito(cliente_id, request.limite_credito)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cliente {} not found", cliente_id)))?;

    state
        .credito_cache
        .invalidate(&credito_cache_key(cliente_id))
        .await;

    tracing::info!(
        "Credit limit for {} set to {:?}",
        cliente_id,
        request.limite_credito
    );
    Ok(Json(cliente))
}

/// POST /api/v1/riesgo/calcular
///
/// Stateless preview: scores the six form inputs and derives the
/// recommendation. This is the path the assessment form hits on every field
/// change, so it validates nothing and persists nothing.
pub async fn calcular_riesgo(
    Json(factores): Json<RiesgoFactores>,
) -> Json<RiesgoPreviewResponse> {
    let (score_riesgo, recomendacion) = riesgo::evaluar(&factores);
    Json(RiesgoPreviewResponse {
        score_riesgo,
        recomendacion,
    })
}

/// PUT /api/v1/servicios/:id/riesgo
///
/// Validates and upserts the risk analysis for a service. A failed save
/// changes nothing; the caller keeps the entered data and may retry.
pub async fn guardar_analisis_riesgo(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(servicio_id): Path<Uuid>,
    Json(request): Json<AnalisisRiesgoRequest>,
) -> Result<Json<AnalisisRiesgoResponse>, AppError> {
    validar_token_api(&state, &headers)?;

    let analisis = riesgo::guardar_analisis(&state.db, servicio_id, &request).await?;
    let (_, recomendacion_auto) = riesgo::evaluar(&analisis.factores());

    Ok(Json(AnalisisRiesgoResponse {
        analisis,
        recomendacion_auto,
    }))
}

/// GET /api/v1/servicios/:id/riesgo
///
/// The stored analysis plus the auto recommendation recomputed from its
/// inputs, so the UI can always show the default next to an override.
pub async fn obtener_analisis_riesgo(
    State(state): State<Arc<AppState>>,
    Path(servicio_id): Path<Uuid>,
) -> Result<Json<AnalisisRiesgoResponse>, AppError> {
    let storage = RiesgoStorage::new(state.db.clone());

    let analisis = storage
        .fetch_analisis(servicio_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No risk analysis for service {}", servicio_id))
        })?;

    let (_, recomendacion_auto) = riesgo::evaluar(&analisis.factores());

    Ok(Json(AnalisisRiesgoResponse {
        analisis,
        recomendacion_auto,
    }))
}

/// Validate the bearer token on mutating endpoints.
///
/// Skipped entirely when no token is configured (trusted-backend mode).
fn validar_token_api(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected) = state.config.api_token else {
        return Ok(());
    };

    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(token, expected) {
        tracing::warn!("Invalid API token received");
        return Err(AppError::Unauthorized("Invalid API token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn validar_limite(limite: Option<f64>) -> Result<(), AppError> {
    match limite {
        Some(l) if !l.is_finite() || l < 0.0 => Err(AppError::BadRequest(
            "limite_credito must be a non-negative amount".to_string(),
        )),
        _ => Ok(()),
    }
}
