use std::f64::consts::TAU;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::models::{
    alert::TriangleAngles,
    common::Configuration,
    geometry,
    measurement::NoisyMeasurement,
    traits::IRangeSensor,
};

/// 真値と計測値の円周上の角度差（ラジアン、[0, π]）
pub fn angular_error(true_angle: f64, measured_angle: f64) -> f64 {
    let diff = (true_angle - measured_angle).abs();
    diff.min(TAU - diff)
}

/// 誤差を集計する角度の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AngleKind {
    #[serde(rename = "CAD")]
    Cad,
    #[serde(rename = "DBC")]
    Dbc,
    #[serde(rename = "BDA")]
    Bda,
    #[serde(rename = "ACB")]
    Acb,
}

impl AngleKind {
    pub const ALL: [AngleKind; 4] = [AngleKind::Cad, AngleKind::Dbc, AngleKind::Bda, AngleKind::Acb];

    pub fn label(&self) -> &'static str {
        match self {
            AngleKind::Cad => "CAD",
            AngleKind::Dbc => "DBC",
            AngleKind::Bda => "BDA",
            AngleKind::Acb => "ACB",
        }
    }

    /// 真の角度のうち該当するもの
    pub fn select(&self, angles: &TriangleAngles) -> f64 {
        match self {
            AngleKind::Cad => angles.cad,
            AngleKind::Dbc => angles.dbc,
            AngleKind::Bda => angles.bda,
            AngleKind::Acb => angles.acb,
        }
    }
}

impl fmt::Display for AngleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// ノイズ付き角度の推定方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseScheme {
    /// ノイズ計測を行わない（警報判定のみ）
    None,
    /// A, B から C, D を、C から A、D から B を計測（ログ再生解析）
    #[default]
    SixRange,
    /// A, B から C, D を計測（モンテカルロ）
    FourRange,
    /// A から C, D を計測し ∠ACB のみ評価（系統的スイープ）
    AcbOnly,
}

impl NoiseScheme {
    pub fn describe(&self) -> &'static str {
        match self {
            NoiseScheme::None => "ノイズ計測なし",
            NoiseScheme::SixRange => "6距離計測 (A,B→C,D / C→A / D→B)",
            NoiseScheme::FourRange => "4距離計測 (A,B→C,D)",
            NoiseScheme::AcbOnly => "ACBのみ (A→C,D)",
        }
    }
}

/// 1つの角度に対する誤差サンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleErrorSample {
    pub kind: AngleKind,
    pub true_angle: f64,
    pub noisy_angle: f64,
    /// 円周誤差（ラジアン）
    pub error: f64,
}

impl AngleErrorSample {
    fn new(kind: AngleKind, true_angle: f64, noisy_angle: f64) -> Self {
        Self {
            kind,
            true_angle,
            noisy_angle,
            error: angular_error(true_angle, noisy_angle),
        }
    }
}

/// 距離と角度誤差の組（距離−誤差の散布データ）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeErrorPoint {
    /// 距離（m）
    pub distance: f64,
    /// 角度誤差（ラジアン）
    pub error: f64,
}

/// 1ステップ分のノイズ付き角度推定結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoisyAngleReport {
    pub samples: Vec<AngleErrorSample>,
    pub range_errors: Vec<RangeErrorPoint>,
    pub measurements: Vec<NoisyMeasurement>,
}

impl NoisyAngleReport {
    /// 指定した角度の誤差
    pub fn error_of(&self, kind: AngleKind) -> Option<f64> {
        self.samples.iter().find(|s| s.kind == kind).map(|s| s.error)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// 方式に従ってノイズ付き角度を推定し、真値との誤差を求める
///
/// 計測は方式ごとに固定された順序で行うため、同じシードからは同じ結果が得られます。
pub fn estimate_noisy_angles(
    scheme: NoiseScheme,
    config: &Configuration,
    true_angles: &TriangleAngles,
    sensor: &mut dyn IRangeSensor,
) -> NoisyAngleReport {
    let (a, b, c, d) = (config.a(), config.b(), config.c(), config.d());

    match scheme {
        NoiseScheme::None => NoisyAngleReport::default(),

        NoiseScheme::SixRange => {
            let c_a = sensor.measure(&a, &c);
            let d_a = sensor.measure(&a, &d);
            let c_b = sensor.measure(&b, &c);
            let d_b = sensor.measure(&b, &d);
            let a_c = sensor.measure(&c, &a);
            let b_d = sensor.measure(&d, &b);

            let cad = AngleErrorSample::new(AngleKind::Cad, true_angles.cad, geometry::angle(&c_a.point, &a, &d_a.point));
            let dbc = AngleErrorSample::new(AngleKind::Dbc, true_angles.dbc, geometry::angle(&d_b.point, &b, &c_b.point));
            let bda = AngleErrorSample::new(AngleKind::Bda, true_angles.bda, geometry::angle(&b, &d_b.point, &a));
            let acb = AngleErrorSample::new(AngleKind::Acb, true_angles.acb, geometry::angle(&a_c.point, &c, &b_d.point));

            let range_errors = vec![
                RangeErrorPoint { distance: c_a.true_distance, error: cad.error },
                RangeErrorPoint { distance: d_a.true_distance, error: cad.error },
                RangeErrorPoint { distance: c_b.true_distance, error: dbc.error },
                RangeErrorPoint { distance: d_b.true_distance, error: dbc.error },
                RangeErrorPoint { distance: a_c.true_distance, error: bda.error },
                RangeErrorPoint { distance: b_d.true_distance, error: acb.error },
            ];

            NoisyAngleReport {
                samples: vec![cad, dbc, bda, acb],
                range_errors,
                measurements: vec![c_a, d_a, c_b, d_b, a_c, b_d],
            }
        }

        NoiseScheme::FourRange => {
            let c_a = sensor.measure(&a, &c);
            let d_a = sensor.measure(&a, &d);
            let c_b = sensor.measure(&b, &c);
            let d_b = sensor.measure(&b, &d);

            let cad = AngleErrorSample::new(AngleKind::Cad, true_angles.cad, geometry::angle(&c_a.point, &a, &d_a.point));
            let dbc = AngleErrorSample::new(AngleKind::Dbc, true_angles.dbc, geometry::angle(&d_b.point, &b, &c_b.point));
            let bda = AngleErrorSample::new(AngleKind::Bda, true_angles.bda, geometry::angle(&b, &d_b.point, &a));
            let acb = AngleErrorSample::new(AngleKind::Acb, true_angles.acb, geometry::angle(&a, &c_a.point, &b));

            let separation = geometry::distance(&a, &config.body2.center());

            NoisyAngleReport {
                samples: vec![cad, dbc, bda, acb],
                range_errors: vec![RangeErrorPoint { distance: separation, error: acb.error }],
                measurements: vec![c_a, d_a, c_b, d_b],
            }
        }

        NoiseScheme::AcbOnly => {
            let c_a = sensor.measure(&a, &c);
            // D の計測は使わないが乱数列を揃えるために行う
            let d_a = sensor.measure(&a, &d);

            let acb = AngleErrorSample::new(AngleKind::Acb, true_angles.acb, geometry::angle(&a, &c_a.point, &b));
            let separation = geometry::distance(&config.body1.center(), &config.body2.center());

            NoisyAngleReport {
                samples: vec![acb],
                range_errors: vec![RangeErrorPoint { distance: separation, error: acb.error }],
                measurements: vec![c_a, d_a],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use crate::models::common::Point2D;
    use crate::models::measurement::RangeSensor;

    fn sample_config() -> Configuration {
        Configuration::from_points(
            Point2D::new(0.0, 0.0),
            Point2D::new(3.0, 0.0),
            Point2D::new(1.5, 5.0),
            Point2D::new(1.5, -5.0),
        )
    }

    #[test]
    fn test_angular_error_identity_and_bounds() {
        for i in 0..64 {
            let x = i as f64 * TAU / 64.0;
            assert_eq!(angular_error(x, x), 0.0);
            for j in 0..64 {
                let y = j as f64 * TAU / 64.0;
                assert!(angular_error(x, y) <= PI);
                assert!(angular_error(x, y) >= 0.0);
            }
        }
    }

    #[test]
    fn test_angular_error_wraps() {
        let err = angular_error(0.1, TAU - 0.1);
        assert!((err - 0.2).abs() < 1e-12);
        assert!((angular_error(0.0, PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_zero_noise_gives_zero_errors() {
        let config = sample_config();
        let angles = TriangleAngles::from_configuration(&config);

        for scheme in [NoiseScheme::SixRange, NoiseScheme::FourRange, NoiseScheme::AcbOnly] {
            let mut sensor = RangeSensor::seeded(0.0, 1).unwrap();
            let report = estimate_noisy_angles(scheme, &config, &angles, &mut sensor);
            assert!(!report.is_empty());
            for sample in &report.samples {
                assert!(sample.error < 1e-12, "{:?} {:?}", scheme, sample);
            }
        }
    }

    #[test]
    fn test_scheme_measurement_counts() {
        let config = sample_config();
        let angles = TriangleAngles::from_configuration(&config);
        let mut sensor = RangeSensor::seeded(0.5, 9).unwrap();

        let none = estimate_noisy_angles(NoiseScheme::None, &config, &angles, &mut sensor);
        assert!(none.is_empty());
        assert_eq!(sensor.get_measurement_count(), 0);

        let six = estimate_noisy_angles(NoiseScheme::SixRange, &config, &angles, &mut sensor);
        assert_eq!(six.samples.len(), 4);
        assert_eq!(six.range_errors.len(), 6);
        assert_eq!(sensor.get_measurement_count(), 6);

        let four = estimate_noisy_angles(NoiseScheme::FourRange, &config, &angles, &mut sensor);
        assert_eq!(four.samples.len(), 4);
        assert_eq!(four.range_errors.len(), 1);
        assert_eq!(sensor.get_measurement_count(), 10);

        let acb = estimate_noisy_angles(NoiseScheme::AcbOnly, &config, &angles, &mut sensor);
        assert_eq!(acb.samples.len(), 1);
        assert!(acb.error_of(AngleKind::Acb).is_some());
        assert!(acb.error_of(AngleKind::Cad).is_none());
        assert_eq!(sensor.get_measurement_count(), 12);
    }

    #[test]
    fn test_six_range_pairs_distances_with_errors() {
        let config = sample_config();
        let angles = TriangleAngles::from_configuration(&config);
        let mut sensor = RangeSensor::seeded(0.5, 5).unwrap();

        let report = estimate_noisy_angles(NoiseScheme::SixRange, &config, &angles, &mut sensor);
        let cad = report.error_of(AngleKind::Cad).unwrap();
        let acb = report.error_of(AngleKind::Acb).unwrap();
        assert_eq!(report.range_errors[0].error, cad);
        assert_eq!(report.range_errors[1].error, cad);
        assert_eq!(report.range_errors[5].error, acb);
        assert!((report.range_errors[0].distance - 5.220153254455275).abs() < 1e-12);
    }

    #[test]
    fn test_acb_only_uses_body_center_separation() {
        let config = sample_config();
        let angles = TriangleAngles::from_configuration(&config);
        let mut sensor = RangeSensor::seeded(0.5, 5).unwrap();

        let report = estimate_noisy_angles(NoiseScheme::AcbOnly, &config, &angles, &mut sensor);
        // body1 中心 (1.5, 0)、body2 中心 (1.5, 0)
        assert_eq!(report.range_errors[0].distance, 0.0);
    }
}
