use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============ Database Models ============

/// A client of the custody operation (the party that gets invoiced).
///
/// `limite_credito` is the credit ceiling in MXN; `None` means the client
/// has no ceiling (unlimited credit).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cliente {
    /// Unique identifier for the client.
    pub id: Uuid,
    /// Commercial name.
    pub nombre: String,
    /// Mexican taxpayer id (RFC). Optional, validated on write when present.
    pub rfc: Option<String>,
    /// Credit ceiling. `None` = unlimited.
    pub limite_credito: Option<bigdecimal::BigDecimal>,
    /// Agreed payment term in days.
    pub dias_credito: Option<i32>,
    /// Whether the client is active.
    pub activo: bool,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// An invoice issued to a client.
///
/// `estado` lifecycle: `pendiente` → `parcial` → `pagada`, with `vencida`
/// for overdue and `cancelada` for voided invoices. Cancelled invoices are
/// excluded from every credit aggregate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Factura {
    /// Unique identifier for the invoice.
    pub id: Uuid,
    /// Client the invoice was issued to.
    pub cliente_id: Uuid,
    /// Invoice folio as printed on the CFDI.
    pub folio: Option<String>,
    /// Invoice total.
    pub total: bigdecimal::BigDecimal,
    /// Issue date.
    pub fecha_emision: NaiveDate,
    /// Due date.
    pub fecha_vencimiento: NaiveDate,
    /// Invoice state (`pendiente`, `parcial`, `pagada`, `vencida`, `cancelada`).
    pub estado: String,
    /// Date the invoice was fully paid, when known.
    pub fecha_pago: Option<NaiveDate>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

/// A payment received from a client.
///
/// Only payments with `estado = 'aplicado'` count toward payment history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Pago {
    /// Unique identifier for the payment.
    pub id: Uuid,
    /// Client the payment came from.
    pub cliente_id: Uuid,
    /// Invoice the payment was applied to, when tracked.
    pub factura_id: Option<Uuid>,
    /// Payment amount.
    pub monto: bigdecimal::BigDecimal,
    /// Date the payment was received.
    pub fecha_pago: NaiveDate,
    /// Payment state (`aplicado`, `pendiente`, `rechazado`).
    pub estado: String,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

/// Per-client accounts-receivable aging aggregate (read from the
/// `ops.cartera_aging` view).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CarteraAging {
    /// Client the aggregate belongs to.
    pub cliente_id: Uuid,
    /// Outstanding balance across open invoices.
    pub saldo_pendiente: bigdecimal::BigDecimal,
    /// Portion of the balance already past due.
    pub total_vencido: bigdecimal::BigDecimal,
}

// ============ Credit Analysis (derived, never stored) ============

/// Behavioral classification derived from the credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comportamiento {
    Excelente,
    Bueno,
    Regular,
    Riesgoso,
}

impl Comportamiento {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comportamiento::Excelente => "excelente",
            Comportamiento::Bueno => "bueno",
            Comportamiento::Regular => "regular",
            Comportamiento::Riesgoso => "riesgoso",
        }
    }
}

impl fmt::Display for Comportamiento {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full credit analysis for one client, computed on demand.
///
/// `credito_disponible` is `None` when the client has no credit ceiling;
/// callers must check before doing arithmetic on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClienteCreditoAnalisis {
    /// Client the analysis belongs to.
    pub cliente_id: Uuid,
    /// Client name, for display.
    pub nombre: String,
    /// Credit ceiling. `None` = unlimited.
    pub limite_credito: Option<f64>,
    /// Agreed payment term in days.
    pub dias_credito: Option<i32>,
    /// Current outstanding balance.
    pub saldo_actual: f64,
    /// Remaining credit under the ceiling. `None` = unlimited.
    pub credito_disponible: Option<f64>,
    /// Rounded utilization percentage; 0 when there is no ceiling.
    pub credito_utilizado_pct: u32,
    /// Invoices in `pendiente` or `parcial` state.
    pub facturas_pendientes: i64,
    /// Invoices in `vencida` state.
    pub facturas_vencidas: i64,
    /// Mean days between issue and full payment, over paid invoices.
    pub dias_promedio_pago: i64,
    /// Applied payments received in the trailing 30 days.
    pub historial_pagos_30d: f64,
    /// Applied payments received in the trailing 60 days.
    pub historial_pagos_60d: f64,
    /// Applied payments received in the trailing 90 days.
    pub historial_pagos_90d: f64,
    /// Behavioral score in [0, 100].
    pub score_crediticio: u8,
    /// Classification derived from the score.
    pub comportamiento: Comportamiento,
}

// ============ Risk Analysis ============

/// Risk tier for a client or an operation zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NivelRiesgo {
    Bajo,
    Medio,
    Alto,
    MuyAlto,
}

impl NivelRiesgo {
    pub fn as_str(&self) -> &'static str {
        match self {
            NivelRiesgo::Bajo => "bajo",
            NivelRiesgo::Medio => "medio",
            NivelRiesgo::Alto => "alto",
            NivelRiesgo::MuyAlto => "muy_alto",
        }
    }
}

impl FromStr for NivelRiesgo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bajo" => Ok(NivelRiesgo::Bajo),
            "medio" => Ok(NivelRiesgo::Medio),
            "alto" => Ok(NivelRiesgo::Alto),
            "muy_alto" => Ok(NivelRiesgo::MuyAlto),
            other => Err(format!("nivel de riesgo desconocido: '{}'", other)),
        }
    }
}

/// Declared financial situation of the requesting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SituacionFinanciera {
    Estable,
    Regular,
    Inestable,
    Desconocida,
}

impl SituacionFinanciera {
    pub fn as_str(&self) -> &'static str {
        match self {
            SituacionFinanciera::Estable => "estable",
            SituacionFinanciera::Regular => "regular",
            SituacionFinanciera::Inestable => "inestable",
            SituacionFinanciera::Desconocida => "desconocida",
        }
    }
}

impl FromStr for SituacionFinanciera {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "estable" => Ok(SituacionFinanciera::Estable),
            "regular" => Ok(SituacionFinanciera::Regular),
            "inestable" => Ok(SituacionFinanciera::Inestable),
            "desconocida" => Ok(SituacionFinanciera::Desconocida),
            other => Err(format!("situación financiera desconocida: '{}'", other)),
        }
    }
}

/// Approval recommendation derived from the risk score.
///
/// These tiers are a different scale from [`Comportamiento`]: they gate a
/// single service request, not a client's credit standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recomendacion {
    Aprobar,
    AprobarConCondiciones,
    RequiereRevision,
    Rechazar,
}

impl Recomendacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recomendacion::Aprobar => "aprobar",
            Recomendacion::AprobarConCondiciones => "aprobar_con_condiciones",
            Recomendacion::RequiereRevision => "requiere_revision",
            Recomendacion::Rechazar => "rechazar",
        }
    }
}

impl FromStr for Recomendacion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aprobar" => Ok(Recomendacion::Aprobar),
            "aprobar_con_condiciones" => Ok(Recomendacion::AprobarConCondiciones),
            "requiere_revision" => Ok(Recomendacion::RequiereRevision),
            "rechazar" => Ok(Recomendacion::Rechazar),
            other => Err(format!("recomendación desconocida: '{}'", other)),
        }
    }
}

/// The six scoring inputs of the risk assessment form.
///
/// This is the exact input of the risk scorer; everything in it is cheap to
/// copy so the scorer can be re-run on every field change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiesgoFactores {
    pub nivel_riesgo_cliente: NivelRiesgo,
    pub nivel_riesgo_zona: NivelRiesgo,
    pub situacion_financiera: SituacionFinanciera,
    pub antecedentes_verificados: bool,
    pub referencias_comerciales: bool,
}

/// Persisted risk analysis for one service request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalisisRiesgo {
    /// Service the analysis belongs to (upsert key).
    pub servicio_id: Uuid,
    pub nivel_riesgo_cliente: NivelRiesgo,
    pub nivel_riesgo_zona: NivelRiesgo,
    pub situacion_financiera: SituacionFinanciera,
    pub antecedentes_verificados: bool,
    pub referencias_comerciales: bool,
    /// Free-text description of the operation zone. Required on save.
    pub zona_operacion: String,
    /// Weighted score in [0, 100] at the time of the save.
    pub score_riesgo: f64,
    /// Stored recommendation; may be a manual override of the computed one.
    pub recomendacion: Recomendacion,
    /// Timestamp of the last save.
    pub updated_at: DateTime<Utc>,
}

impl AnalisisRiesgo {
    /// The scoring inputs of this record.
    pub fn factores(&self) -> RiesgoFactores {
        RiesgoFactores {
            nivel_riesgo_cliente: self.nivel_riesgo_cliente,
            nivel_riesgo_zona: self.nivel_riesgo_zona,
            situacion_financiera: self.situacion_financiera,
            antecedentes_verificados: self.antecedentes_verificados,
            referencias_comerciales: self.referencias_comerciales,
        }
    }
}

/// Raw database row for `ops.analisis_riesgo`.
///
/// Categorical columns are stored as text; parsing into the typed record
/// happens at this boundary so nothing downstream handles loose strings.
#[derive(Debug, Clone, FromRow)]
pub struct AnalisisRiesgoRow {
    pub servicio_id: Uuid,
    pub nivel_riesgo_cliente: String,
    pub nivel_riesgo_zona: String,
    pub situacion_financiera: String,
    pub antecedentes_verificados: bool,
    pub referencias_comerciales: bool,
    pub zona_operacion: String,
    pub score_riesgo: f64,
    pub recomendacion: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AnalisisRiesgoRow> for AnalisisRiesgo {
    type Error = String;

    fn try_from(row: AnalisisRiesgoRow) -> Result<Self, Self::Error> {
        Ok(AnalisisRiesgo {
            servicio_id: row.servicio_id,
            nivel_riesgo_cliente: row.nivel_riesgo_cliente.parse()?,
            nivel_riesgo_zona: row.nivel_riesgo_zona.parse()?,
            situacion_financiera: row.situacion_financiera.parse()?,
            antecedentes_verificados: row.antecedentes_verificados,
            referencias_comerciales: row.referencias_comerciales,
            zona_operacion: row.zona_operacion,
            score_riesgo: row.score_riesgo,
            recomendacion: row.recomendacion.parse()?,
            updated_at: row.updated_at,
        })
    }
}

// ============ API Request/Response Models ============

/// Request payload for creating a client.
#[derive(Debug, Deserialize)]
pub struct NuevoClienteRequest {
    pub nombre: String,
    pub rfc: Option<String>,
    pub limite_credito: Option<f64>,
    pub dias_credito: Option<i32>,
}

/// Request payload for setting or clearing a client's credit ceiling.
/// `limite_credito: null` clears the ceiling (unlimited).
#[derive(Debug, Deserialize)]
pub struct LimiteCreditoRequest {
    pub limite_credito: Option<f64>,
}

/// Request payload for saving a risk analysis.
///
/// `recomendacion`, when present, is a reviewer override; otherwise the
/// auto-computed recommendation is stored.
#[derive(Debug, Deserialize)]
pub struct AnalisisRiesgoRequest {
    pub nivel_riesgo_cliente: NivelRiesgo,
    pub nivel_riesgo_zona: NivelRiesgo,
    pub situacion_financiera: SituacionFinanciera,
    pub antecedentes_verificados: bool,
    pub referencias_comerciales: bool,
    pub zona_operacion: String,
    pub recomendacion: Option<Recomendacion>,
}

impl AnalisisRiesgoRequest {
    /// The scoring inputs of this request.
    pub fn factores(&self) -> RiesgoFactores {
        RiesgoFactores {
            nivel_riesgo_cliente: self.nivel_riesgo_cliente,
            nivel_riesgo_zona: self.nivel_riesgo_zona,
            situacion_financiera: self.situacion_financiera,
            antecedentes_verificados: self.antecedentes_verificados,
            referencias_comerciales: self.referencias_comerciales,
        }
    }
}

/// Response of the stateless risk preview endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiesgoPreviewResponse {
    pub score_riesgo: f64,
    pub recomendacion: Recomendacion,
}

/// Stored risk analysis plus the live auto-computed recommendation.
///
/// `recomendacion_auto` is always recomputed from the stored inputs so the
/// UI can show it as the default even after a manual override was saved.
#[derive(Debug, Clone, Serialize)]
pub struct AnalisisRiesgoResponse {
    pub analisis: AnalisisRiesgo,
    pub recomendacion_auto: Recomendacion,
}
