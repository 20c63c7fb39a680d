//! Weighted risk scoring for service requests.
//!
//! The scorer is pure arithmetic over the six assessment-form inputs, so it
//! can be re-run on every field change with no debounce. Persistence is a
//! single upsert keyed by the service id; a reviewer may override the
//! derived recommendation before saving, and the override is what persists.

use crate::db_storage::RiesgoStorage;
use crate::errors::AppError;
use crate::models::{
    AnalisisRiesgo, AnalisisRiesgoRequest, NivelRiesgo, Recomendacion, RiesgoFactores,
    SituacionFinanciera,
};
use sqlx::PgPool;
use uuid::Uuid;

/// Longest accepted `zona_operacion` description.
const ZONA_OPERACION_MAX: usize = 500;

/// Client-tier contribution (max 30 of 100).
fn puntos_cliente(nivel: NivelRiesgo) -> f64 {
    match nivel {
        NivelRiesgo::Bajo => 0.0,
        NivelRiesgo::Medio => 15.0,
        NivelRiesgo::Alto => 25.0,
        NivelRiesgo::MuyAlto => 30.0,
    }
}

/// Zone-tier contribution (max 25 of 100).
fn puntos_zona(nivel: NivelRiesgo) -> f64 {
    match nivel {
        NivelRiesgo::Bajo => 0.0,
        NivelRiesgo::Medio => 10.0,
        NivelRiesgo::Alto => 20.0,
        NivelRiesgo::MuyAlto => 25.0,
    }
}

/// Financial-situation contribution (max 20 of 100).
fn puntos_situacion(situacion: SituacionFinanciera) -> f64 {
    match situacion {
        SituacionFinanciera::Estable => 0.0,
        SituacionFinanciera::Regular => 5.0,
        SituacionFinanciera::Inestable => 15.0,
        SituacionFinanciera::Desconocida => 20.0,
    }
}

/// Verification contribution (max 25 of 100).
///
/// Starts at the full 25 and each verified flag earns back 12.5, so the two
/// checks are independent and symmetric.
fn puntos_verificacion(antecedentes_verificados: bool, referencias_comerciales: bool) -> f64 {
    let mut puntos = 25.0;
    if antecedentes_verificados {
        puntos -= 12.5;
    }
    if referencias_comerciales {
        puntos -= 12.5;
    }
    puntos
}

/// Weighted risk score over the form inputs.
///
/// The weights sum to 100 at maximum-risk inputs, so the sum is naturally
/// bounded; the clamp is defensive only.
pub fn calcular_score(factores: &RiesgoFactores) -> f64 {
    let score = puntos_cliente(factores.nivel_riesgo_cliente)
        + puntos_zona(factores.nivel_riesgo_zona)
        + puntos_situacion(factores.situacion_financiera)
        + puntos_verificacion(
            factores.antecedentes_verificados,
            factores.referencias_comerciales,
        );

    score.clamp(0.0, 100.0)
}

/// Recommendation tiers over the score, ascending risk.
///
/// Boundaries are inclusive on the low side of each tier: 25 still approves,
/// 45 still approves with conditions, 70 still goes to review.
pub fn derivar_recomendacion(score: f64) -> Recomendacion {
    if score <= 25.0 {
        Recomendacion::Aprobar
    } else if score <= 45.0 {
        Recomendacion::AprobarConCondiciones
    } else if score <= 70.0 {
        Recomendacion::RequiereRevision
    } else {
        Recomendacion::Rechazar
    }
}

/// Score plus derived recommendation in one call; the live-recompute path.
pub fn evaluar(factores: &RiesgoFactores) -> (f64, Recomendacion) {
    let score = calcular_score(factores);
    (score, derivar_recomendacion(score))
}

/// Validates the operation-zone description required for submission.
pub fn validar_zona_operacion(zona: &str) -> Result<(), AppError> {
    let zona = zona.trim();
    if zona.is_empty() {
        return Err(AppError::BadRequest(
            "zona_operacion is required".to_string(),
        ));
    }
    if zona.len() > ZONA_OPERACION_MAX {
        return Err(AppError::BadRequest(format!(
            "zona_operacion exceeds {} characters",
            ZONA_OPERACION_MAX
        )));
    }
    Ok(())
}

/// Validates, scores, and upserts the risk analysis for a service.
///
/// The stored recommendation is the reviewer's override when one was sent,
/// otherwise the derived one. Returns the record as persisted.
pub async fn guardar_analisis(
    pool: &PgPool,
    servicio_id: Uuid,
    request: &AnalisisRiesgoRequest,
) -> Result<AnalisisRiesgo, AppError> {
    validar_zona_operacion(&request.zona_operacion)?;

    let (score, recomendacion_auto) = evaluar(&request.factores());
    let recomendacion = request.recomendacion.unwrap_or(recomendacion_auto);

    if recomendacion != recomendacion_auto {
        tracing::info!(
            "Risk analysis for service {}: reviewer override {} (auto was {})",
            servicio_id,
            recomendacion.as_str(),
            recomendacion_auto.as_str()
        );
    }

    let storage = RiesgoStorage::new(pool.clone());
    let guardado = storage
        .upsert_analisis(servicio_id, request, score, recomendacion)
        .await?;

    tracing::info!(
        "Risk analysis saved for service {}: score={} recomendacion={}",
        servicio_id,
        guardado.score_riesgo,
        guardado.recomendacion.as_str()
    );

    Ok(guardado)
}
