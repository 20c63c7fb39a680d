//! Client credit behavior scoring.
//!
//! The analysis is derived, never stored: every request aggregates the
//! client's open invoices, applied payments, and aging row, then runs the
//! deterministic deduction-based score. The three reads are independent and
//! run concurrently; the score itself does no I/O.

use crate::db_storage::CarteraStorage;
use crate::errors::AppError;
use crate::models::{
    CarteraAging, Cliente, ClienteCreditoAnalisis, Comportamiento, Factura, Pago,
};
use bigdecimal::ToPrimitive;
use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;

/// Aggregated inputs of the credit score, computed from a client's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditoMetricas {
    pub saldo_actual: f64,
    pub limite_credito: Option<f64>,
    pub credito_utilizado_pct: u32,
    pub facturas_pendientes: i64,
    pub facturas_vencidas: i64,
    pub dias_promedio_pago: i64,
    pub historial_pagos_30d: f64,
    pub historial_pagos_60d: f64,
    pub historial_pagos_90d: f64,
}

impl CreditoMetricas {
    /// Aggregates invoice and payment rows into scoring inputs.
    ///
    /// `saldo_actual` comes from the aging row when one exists; otherwise it
    /// falls back to summing the client's open (non-cancelled, not fully
    /// paid) invoice totals. `hoy` is passed in so the trailing payment
    /// windows are reproducible in tests.
    pub fn calcular(
        cliente: &Cliente,
        facturas: &[Factura],
        pagos: &[Pago],
        aging: Option<&CarteraAging>,
        hoy: NaiveDate,
    ) -> Self {
        let limite_credito = cliente
            .limite_credito
            .as_ref()
            .and_then(|l| l.to_f64())
            .filter(|l| *l > 0.0);

        let saldo_actual = match aging {
            Some(a) => a.saldo_pendiente.to_f64().unwrap_or(0.0),
            None => facturas
                .iter()
                .filter(|f| f.estado != "pagada" && f.estado != "cancelada")
                .filter_map(|f| f.total.to_f64())
                .sum(),
        };

        let facturas_pendientes = facturas
            .iter()
            .filter(|f| f.estado == "pendiente" || f.estado == "parcial")
            .count() as i64;
        let facturas_vencidas = facturas.iter().filter(|f| f.estado == "vencida").count() as i64;

        CreditoMetricas {
            saldo_actual,
            limite_credito,
            credito_utilizado_pct: credito_utilizado_pct(saldo_actual, limite_credito),
            facturas_pendientes,
            facturas_vencidas,
            dias_promedio_pago: dias_promedio_pago(facturas),
            historial_pagos_30d: suma_pagos_ventana(pagos, hoy, 30),
            historial_pagos_60d: suma_pagos_ventana(pagos, hoy, 60),
            historial_pagos_90d: suma_pagos_ventana(pagos, hoy, 90),
        }
    }
}

/// Rounded credit utilization percentage.
///
/// A missing or non-positive ceiling short-circuits to 0 so the division can
/// never produce NaN or infinity.
pub fn credito_utilizado_pct(saldo_actual: f64, limite_credito: Option<f64>) -> u32 {
    match limite_credito {
        Some(limite) if limite > 0.0 => ((saldo_actual / limite) * 100.0).round() as u32,
        _ => 0,
    }
}

/// Remaining credit under the ceiling, floored at zero.
/// `None` means the client has no ceiling; callers must check before
/// doing arithmetic on the value.
pub fn credito_disponible(limite_credito: Option<f64>, saldo_actual: f64) -> Option<f64> {
    limite_credito.map(|limite| (limite - saldo_actual).max(0.0))
}

/// Mean days between issue and full payment over paid invoices with a
/// recorded payment date; 0 when there are none.
pub fn dias_promedio_pago(facturas: &[Factura]) -> i64 {
    let dias: Vec<i64> = facturas
        .iter()
        .filter(|f| f.estado == "pagada")
        .filter_map(|f| f.fecha_pago.map(|fp| (fp - f.fecha_emision).num_days()))
        .collect();

    if dias.is_empty() {
        return 0;
    }
    let suma: i64 = dias.iter().sum();
    (suma as f64 / dias.len() as f64).round() as i64
}

/// Sum of applied-payment amounts whose date falls within the trailing
/// `dias` days of `hoy` (inclusive on both ends).
pub fn suma_pagos_ventana(pagos: &[Pago], hoy: NaiveDate, dias: i64) -> f64 {
    let desde = hoy - Duration::days(dias);
    pagos
        .iter()
        .filter(|p| p.estado == "aplicado")
        .filter(|p| p.fecha_pago >= desde && p.fecha_pago <= hoy)
        .filter_map(|p| p.monto.to_f64())
        .sum()
}

/// Deduction-based behavioral score.
///
/// Starts at 100; each overdue invoice costs 15 (uncapped), utilization and
/// payment speed each deduct from a single bracket, and any payment in the
/// trailing 30 days earns back 5. Result clamped to [0, 100].
pub fn puntaje_credito(m: &CreditoMetricas) -> u8 {
    let mut score: i64 = 100;

    score -= 15 * m.facturas_vencidas;

    if m.credito_utilizado_pct > 90 {
        score -= 20;
    } else if m.credito_utilizado_pct > 70 {
        score -= 10;
    }

    if m.dias_promedio_pago > 60 {
        score -= 20;
    } else if m.dias_promedio_pago > 45 {
        score -= 10;
    } else if m.dias_promedio_pago > 30 {
        score -= 5;
    }

    if m.historial_pagos_30d > 0.0 {
        score += 5;
    }

    score.clamp(0, 100) as u8
}

/// Classification tiers over the clamped score.
pub fn clasificar_comportamiento(score: u8) -> Comportamiento {
    match score {
        85..=100 => Comportamiento::Excelente,
        70..=84 => Comportamiento::Bueno,
        50..=69 => Comportamiento::Regular,
        _ => Comportamiento::Riesgoso,
    }
}

/// Validates a Mexican RFC (12 or 13 characters, uppercase).
pub fn es_rfc_valido(rfc: &str) -> bool {
    let rfc = rfc.trim();
    let largo = rfc.chars().count();
    if !(12..=13).contains(&largo) {
        return false;
    }

    let rfc_regex = Regex::new(r"^[A-ZÑ&]{3,4}[0-9]{6}[A-Z0-9]{3}$").unwrap();
    if !rfc_regex.is_match(rfc) {
        tracing::warn!("Invalid RFC format: {}", rfc);
        return false;
    }

    true
}

/// Computes the full credit analysis for one client.
///
/// Returns `Ok(None)` when the client does not exist; absence is "no
/// analysis available", not an error. The invoice, payment, and aging reads
/// run concurrently and the score is computed once all three resolve.
pub async fn analizar_cliente(
    pool: &PgPool,
    cliente_id: Uuid,
) -> Result<Option<ClienteCreditoAnalisis>, AppError> {
    let storage = CarteraStorage::new(pool.clone());

    let Some(cliente) = storage.fetch_cliente(cliente_id).await? else {
        tracing::debug!("Credit analysis requested for unknown client {}", cliente_id);
        return Ok(None);
    };

    let (facturas, pagos, aging) = tokio::try_join!(
        storage.fetch_facturas(cliente_id),
        storage.fetch_pagos_aplicados(cliente_id),
        storage.fetch_aging(cliente_id),
    )?;

    let hoy = Utc::now().date_naive();
    let analisis = construir_analisis(&cliente, &facturas, &pagos, aging.as_ref(), hoy);

    tracing::info!(
        "Credit analysis for {}: score={} comportamiento={} ({} facturas, {} pagos)",
        cliente_id,
        analisis.score_crediticio,
        analisis.comportamiento,
        facturas.len(),
        pagos.len()
    );

    Ok(Some(analisis))
}

/// Pure assembly of the analysis record from already-fetched rows.
pub fn construir_analisis(
    cliente: &Cliente,
    facturas: &[Factura],
    pagos: &[Pago],
    aging: Option<&CarteraAging>,
    hoy: NaiveDate,
) -> ClienteCreditoAnalisis {
    let metricas = CreditoMetricas::calcular(cliente, facturas, pagos, aging, hoy);
    let score = puntaje_credito(&metricas);

    ClienteCreditoAnalisis {
        cliente_id: cliente.id,
        nombre: cliente.nombre.clone(),
        limite_credito: metricas.limite_credito,
        dias_credito: cliente.dias_credito,
        saldo_actual: metricas.saldo_actual,
        credito_disponible: credito_disponible(metricas.limite_credito, metricas.saldo_actual),
        credito_utilizado_pct: metricas.credito_utilizado_pct,
        facturas_pendientes: metricas.facturas_pendientes,
        facturas_vencidas: metricas.facturas_vencidas,
        dias_promedio_pago: metricas.dias_promedio_pago,
        historial_pagos_30d: metricas.historial_pagos_30d,
        historial_pagos_60d: metricas.historial_pagos_60d,
        historial_pagos_90d: metricas.historial_pagos_90d,
        score_crediticio: score,
        comportamiento: clasificar_comportamiento(score),
    }
}
