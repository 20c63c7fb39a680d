/// Property-based tests using proptest
/// Invariants of both scorers: clamping, monotonicity, bracket exclusivity,
/// and exact verification deltas.
use proptest::prelude::*;
use rust_custodia_api::credito::{
    clasificar_comportamiento, credito_disponible, credito_utilizado_pct, puntaje_credito,
    CreditoMetricas,
};
use rust_custodia_api::models::{
    Comportamiento, NivelRiesgo, Recomendacion, RiesgoFactores, SituacionFinanciera,
};
use rust_custodia_api::riesgo::{calcular_score, derivar_recomendacion};

fn nivel_riesgo() -> impl Strategy<Value = NivelRiesgo> {
    prop::sample::select(vec![
        NivelRiesgo::Bajo,
        NivelRiesgo::Medio,
        NivelRiesgo::Alto,
        NivelRiesgo::MuyAlto,
    ])
}

fn situacion_financiera() -> impl Strategy<Value = SituacionFinanciera> {
    prop::sample::select(vec![
        SituacionFinanciera::Estable,
        SituacionFinanciera::Regular,
        SituacionFinanciera::Inestable,
        SituacionFinanciera::Desconocida,
    ])
}

prop_compose! {
    fn riesgo_factores()(
        nivel_riesgo_cliente in nivel_riesgo(),
        nivel_riesgo_zona in nivel_riesgo(),
        situacion_financiera in situacion_financiera(),
        antecedentes_verificados in proptest::bool::ANY,
        referencias_comerciales in proptest::bool::ANY,
    ) -> RiesgoFactores {
        RiesgoFactores {
            nivel_riesgo_cliente,
            nivel_riesgo_zona,
            situacion_financiera,
            antecedentes_verificados,
            referencias_comerciales,
        }
    }
}

prop_compose! {
    fn credito_metricas()(
        saldo_actual in 0.0f64..1e9,
        limite in prop::option::of(0.0f64..1e9),
        facturas_pendientes in 0i64..500,
        facturas_vencidas in 0i64..500,
        dias_promedio_pago in 0i64..1000,
        historial_pagos_30d in 0.0f64..1e9,
        historial_pagos_60d in 0.0f64..1e9,
        historial_pagos_90d in 0.0f64..1e9,
    ) -> CreditoMetricas {
        CreditoMetricas {
            saldo_actual,
            limite_credito: limite,
            credito_utilizado_pct: credito_utilizado_pct(saldo_actual, limite),
            facturas_pendientes,
            facturas_vencidas,
            dias_promedio_pago,
            historial_pagos_30d,
            historial_pagos_60d,
            historial_pagos_90d,
        }
    }
}

// Property: the risk score is always within [0, 100]
proptest! {
    #[test]
    fn riesgo_score_siempre_en_rango(f in riesgo_factores()) {
        let score = calcular_score(&f);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn riesgo_score_es_determinista(f in riesgo_factores()) {
        prop_assert_eq!(calcular_score(&f), calcular_score(&f));
    }
}

// Property: verifying a flag never raises the risk score, and the delta is
// exactly 12.5 per flag
proptest! {
    #[test]
    fn verificar_antecedentes_nunca_sube_el_score(f in riesgo_factores()) {
        let sin = RiesgoFactores { antecedentes_verificados: false, ..f };
        let con = RiesgoFactores { antecedentes_verificados: true, ..f };
        prop_assert!(calcular_score(&con) <= calcular_score(&sin));
        prop_assert_eq!(calcular_score(&sin) - calcular_score(&con), 12.5);
    }

    #[test]
    fn verificar_ambas_resta_exactamente_25(f in riesgo_factores()) {
        let sin = RiesgoFactores {
            antecedentes_verificados: false,
            referencias_comerciales: false,
            ..f
        };
        let con = RiesgoFactores {
            antecedentes_verificados: true,
            referencias_comerciales: true,
            ..f
        };
        prop_assert_eq!(calcular_score(&sin) - calcular_score(&con), 25.0);
    }
}

// Property: the recommendation tiers cover the whole range and agree with
// the documented boundaries
proptest! {
    #[test]
    fn recomendacion_cubre_todo_el_rango(score in 0.0f64..=100.0) {
        let r = derivar_recomendacion(score);
        match r {
            Recomendacion::Aprobar => prop_assert!(score <= 25.0),
            Recomendacion::AprobarConCondiciones => {
                prop_assert!(score > 25.0 && score <= 45.0)
            }
            Recomendacion::RequiereRevision => prop_assert!(score > 45.0 && score <= 70.0),
            Recomendacion::Rechazar => prop_assert!(score > 70.0),
        }
    }
}

// Property: the credit score is always within [0, 100]
proptest! {
    #[test]
    fn credito_score_siempre_en_rango(m in credito_metricas()) {
        let score = puntaje_credito(&m);
        prop_assert!(score <= 100);
    }

    #[test]
    fn comportamiento_consistente_con_el_score(m in credito_metricas()) {
        let score = puntaje_credito(&m);
        let c = clasificar_comportamiento(score);
        match c {
            Comportamiento::Excelente => prop_assert!(score >= 85),
            Comportamiento::Bueno => prop_assert!((70..=84).contains(&score)),
            Comportamiento::Regular => prop_assert!((50..=69).contains(&score)),
            Comportamiento::Riesgoso => prop_assert!(score < 50),
        }
    }
}

// Property: one more overdue invoice never raises the credit score
proptest! {
    #[test]
    fn factura_vencida_adicional_nunca_sube_el_score(m in credito_metricas()) {
        let mas_vencidas = CreditoMetricas {
            facturas_vencidas: m.facturas_vencidas + 1,
            ..m.clone()
        };
        prop_assert!(puntaje_credito(&mas_vencidas) <= puntaje_credito(&m));
    }
}

// Property: utilization never divides by a missing or zero ceiling
proptest! {
    #[test]
    fn utilizacion_sin_limite_siempre_cero(saldo in 0.0f64..1e12) {
        prop_assert_eq!(credito_utilizado_pct(saldo, None), 0);
        prop_assert_eq!(credito_utilizado_pct(saldo, Some(0.0)), 0);
    }

    #[test]
    fn credito_disponible_nunca_negativo(
        saldo in 0.0f64..1e9,
        limite in prop::option::of(0.0f64..1e9),
    ) {
        match credito_disponible(limite, saldo) {
            Some(disponible) => prop_assert!(disponible >= 0.0),
            None => prop_assert!(limite.is_none()),
        }
    }
}
