use crate::errors::AppError;
use crate::models::{
    AnalisisRiesgo, AnalisisRiesgoRequest, AnalisisRiesgoRow, CarteraAging, Cliente, Factura,
    NuevoClienteRequest, Pago, Recomendacion,
};
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Applied payments are capped to the most recent 50 per client; older
/// history does not influence the trailing windows.
const PAGOS_HISTORIAL_LIMIT: i64 = 50;

/// Converts an API-side amount into the NUMERIC representation.
fn a_bigdecimal(valor: f64) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(&valor.to_string())
        .map_err(|_| AppError::BadRequest(format!("invalid amount: {}", valor)))
}

/// Read side of the client credit ledger (cartera).
///
/// Every fetch is scoped to one client; cancelled invoices and non-applied
/// payments are filtered out here so the scoring layer never sees them.
pub struct CarteraStorage {
    pool: PgPool,
}

impl CarteraStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches a client by id; `None` when it does not exist.
    pub async fn fetch_cliente(&self, cliente_id: Uuid) -> Result<Option<Cliente>, AppError> {
        let cliente = sqlx::query_as::<_, Cliente>("SELECT * FROM ops.clientes WHERE id = $1")
            .bind(cliente_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cliente)
    }

    /// Non-cancelled invoices for a client, newest first.
    pub async fn fetch_facturas(&self, cliente_id: Uuid) -> Result<Vec<Factura>, AppError> {
        let facturas = sqlx::query_as::<_, Factura>(
            r#"
            SELECT * FROM ops.facturas
            WHERE cliente_id = $1 AND estado <> 'cancelada'
            ORDER BY fecha_emision DESC
            "#,
        )
        .bind(cliente_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(facturas)
    }

    /// Most recent applied payments for a client.
    pub async fn fetch_pagos_aplicados(&self, cliente_id: Uuid) -> Result<Vec<Pago>, AppError> {
        let pagos = sqlx::query_as::<_, Pago>(
            r#"
            SELECT * FROM ops.pagos
            WHERE cliente_id = $1 AND estado = 'aplicado'
            ORDER BY fecha_pago DESC
            LIMIT $2
            "#,
        )
        .bind(cliente_id)
        .bind(PAGOS_HISTORIAL_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(pagos)
    }

    /// Aging aggregate row for a client; `None` when the view has no row
    /// (client with no invoicing history yet).
    pub async fn fetch_aging(&self, cliente_id: Uuid) -> Result<Option<CarteraAging>, AppError> {
        let aging = sqlx::query_as::<_, CarteraAging>(
            "SELECT * FROM ops.cartera_aging WHERE cliente_id = $1",
        )
        .bind(cliente_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(aging)
    }

    /// Inserts a new client and returns the stored row.
    pub async fn insertar_cliente(
        &self,
        request: &NuevoClienteRequest,
    ) -> Result<Cliente, AppError> {
        let limite = request.limite_credito.map(a_bigdecimal).transpose()?;

        let cliente = sqlx::query_as::<_, Cliente>(
            r#"
            INSERT INTO ops.clientes (id, nombre, rfc, limite_credito, dias_credito, activo, created_at)
            VALUES ($1, $2, $3, $4, $5, true, now())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.nombre.trim())
        .bind(request.rfc.as_deref().map(str::trim))
        .bind(limite)
        .bind(request.dias_credito)
        .fetch_one(&self.pool)
        .await?;

        Ok(cliente)
    }

    /// Sets or clears a client's credit ceiling. `None` clears it
    /// (unlimited). Returns the updated row, or `None` for an unknown client.
    pub async fn actualizar_limite_credito(
        &self,
        cliente_id: Uuid,
        limite_credito: Option<f64>,
    ) -> Result<Option<Cliente>, AppError> {
        let limite = limite_credito.map(a_bigdecimal).transpose()?;

        let cliente = sqlx::query_as::<_, Cliente>(
            r#"
            UPDATE ops.clientes
            SET limite_credito = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(cliente_id)
        .bind(limite)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cliente)
    }
}

/// Persistence for service risk analyses.
pub struct RiesgoStorage {
    pool: PgPool,
}

impl RiesgoStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts the analysis for a service. One row per service; each save
    /// overwrites the previous one, no history is kept.
    pub async fn upsert_analisis(
        &self,
        servicio_id: Uuid,
        request: &AnalisisRiesgoRequest,
        score_riesgo: f64,
        recomendacion: Recomendacion,
    ) -> Result<AnalisisRiesgo, AppError> {
        let row = sqlx::query_as::<_, AnalisisRiesgoRow>(
            r#"
            INSERT INTO ops.analisis_riesgo (
                servicio_id, nivel_riesgo_cliente, nivel_riesgo_zona,
                situacion_financiera, antecedentes_verificados,
                referencias_comerciales, zona_operacion, score_riesgo,
                recomendacion, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (servicio_id) DO UPDATE SET
                nivel_riesgo_cliente = EXCLUDED.nivel_riesgo_cliente,
                nivel_riesgo_zona = EXCLUDED.nivel_riesgo_zona,
                situacion_financiera = EXCLUDED.situacion_financiera,
                antecedentes_verificados = EXCLUDED.antecedentes_verificados,
                referencias_comerciales = EXCLUDED.referencias_comerciales,
                zona_operacion = EXCLUDED.zona_operacion,
                score_riesgo = EXCLUDED.score_riesgo,
                recomendacion = EXCLUDED.recomendacion,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(servicio_id)
        .bind(request.nivel_riesgo_cliente.as_str())
        .bind(request.nivel_riesgo_zona.as_str())
        .bind(request.situacion_financiera.as_str())
        .bind(request.antecedentes_verificados)
        .bind(request.referencias_comerciales)
        .bind(request.zona_operacion.trim())
        .bind(score_riesgo)
        .bind(recomendacion.as_str())
        .fetch_one(&self.pool)
        .await?;

        AnalisisRiesgo::try_from(row)
            .map_err(|e| AppError::InternalError(format!("stored analysis is corrupt: {}", e)))
    }

    /// Fetches the stored analysis for a service; `None` when absent.
    pub async fn fetch_analisis(
        &self,
        servicio_id: Uuid,
    ) -> Result<Option<AnalisisRiesgo>, AppError> {
        let row = sqlx::query_as::<_, AnalisisRiesgoRow>(
            "SELECT * FROM ops.analisis_riesgo WHERE servicio_id = $1",
        )
        .bind(servicio_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AnalisisRiesgo::try_from)
            .transpose()
            .map_err(|e| AppError::InternalError(format!("stored analysis is corrupt: {}", e)))
    }
}
