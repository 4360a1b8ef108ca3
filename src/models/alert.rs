//! # Alert モジュール
//!
//! 2台のフォークリフト（A-B、C-D）の相対配置から警報状態を判定します。
//!
//! ## 判定手順
//!
//! 1. 4つの三角形角度 ∠CAD, ∠DBC, ∠ACB, ∠BDA を求める
//! 2. それぞれの正接 ta, tb, tc, td を求める
//! 3. m = ta·tc·td、n = tb·tc·td
//! 4. |m| または |n| が角度閾値を超えれば角度警報
//! 5. 距離警報が有効なら、交差端点間距離のいずれかが距離閾値未満で距離警報
//!
//! 判定は純粋関数であり、同じ入力と閾値からは常に同じ結果が得られます。

use serde::{Deserialize, Serialize};

use crate::models::{
    common::{Configuration, Point2D},
    geometry,
};

/// 正接積の閾値の既定値
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 0.05;
/// 端点間距離の閾値の既定値（m）
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.8;

/// 警報判定の閾値設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// |m|, |n| の閾値
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold: f64,
    /// 交差端点間距離の閾値（m）
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
    /// 距離警報を有効にするか
    #[serde(default = "default_enable_distance_alert")]
    pub enable_distance_alert: bool,
}

fn default_angle_threshold() -> f64 {
    DEFAULT_ANGLE_THRESHOLD
}

fn default_distance_threshold() -> f64 {
    DEFAULT_DISTANCE_THRESHOLD
}

fn default_enable_distance_alert() -> bool {
    true
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            enable_distance_alert: true,
        }
    }
}

/// 4つの三角形角度（ラジアン、[0, 2π)）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriangleAngles {
    /// ∠CAD（頂点A）
    pub cad: f64,
    /// ∠DBC（頂点B）
    pub dbc: f64,
    /// ∠ACB（頂点C）
    pub acb: f64,
    /// ∠BDA（頂点D）
    pub bda: f64,
}

impl TriangleAngles {
    pub fn from_configuration(config: &Configuration) -> Self {
        let (a, b, c, d) = (config.a(), config.b(), config.c(), config.d());
        Self {
            cad: geometry::angle(&c, &a, &d),
            dbc: geometry::angle(&d, &b, &c),
            acb: geometry::angle(&a, &c, &b),
            bda: geometry::angle(&b, &d, &a),
        }
    }
}

/// 4角度の正接
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tangents {
    pub ta: f64,
    pub tb: f64,
    pub tc: f64,
    pub td: f64,
}

impl Tangents {
    /// 角度から正接を求める
    ///
    /// `f64::tan` は表現可能な全ての角度で有限値を返します（π/2 に最も近い倍精度値では
    /// 約 1.633e16）。この巨大な有限値をそのまま番兵として扱います。
    pub fn from_angles(angles: &TriangleAngles) -> Self {
        Self {
            ta: angles.cad.tan(),
            tb: angles.dbc.tan(),
            tc: angles.acb.tan(),
            td: angles.bda.tan(),
        }
    }
}

/// 交差端点間の距離（body1 の端点 × body2 の端点）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossDistances {
    pub ac: f64,
    pub ad: f64,
    pub bc: f64,
    pub bd: f64,
}

impl CrossDistances {
    pub fn from_configuration(config: &Configuration) -> Self {
        let (a, b, c, d) = (config.a(), config.b(), config.c(), config.d());
        Self {
            ac: geometry::distance(&a, &c),
            ad: geometry::distance(&a, &d),
            bc: geometry::distance(&b, &c),
            bd: geometry::distance(&b, &d),
        }
    }

    /// ラベル付きで列挙（表示用）
    pub fn labeled(&self) -> [(&'static str, f64); 4] {
        [("AC", self.ac), ("AD", self.ad), ("BC", self.bc), ("BD", self.bd)]
    }

    pub fn min(&self) -> f64 {
        self.ac.min(self.ad).min(self.bc).min(self.bd)
    }
}

/// 1ステップ分の警報判定結果と中間量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertEvaluation {
    pub angles: TriangleAngles,
    pub tangents: Tangents,
    /// ta·tc·td
    pub m: f64,
    /// tb·tc·td
    pub n: f64,
    pub distances: CrossDistances,
    /// 正接積による警報
    pub angle_alert: bool,
    /// 距離による警報（無効時は常にfalse）
    pub distance_alert: bool,
    /// 最終的な警報状態
    pub alert: bool,
}

/// NaN の正接積は +∞ に置き換える（警報を発火させる）
fn guard_product(product: f64) -> f64 {
    if product.is_nan() { f64::INFINITY } else { product }
}

/// 警報判定器
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    pub thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// 配置を評価して警報状態を求める
    pub fn evaluate(&self, config: &Configuration) -> AlertEvaluation {
        let angles = TriangleAngles::from_configuration(config);
        let tangents = Tangents::from_angles(&angles);

        let m = guard_product(tangents.ta * tangents.tc * tangents.td);
        let n = guard_product(tangents.tb * tangents.tc * tangents.td);

        let threshold = self.thresholds.angle_threshold;
        let angle_alert = m.abs() > threshold || n.abs() > threshold;

        let distances = CrossDistances::from_configuration(config);
        let distance_alert = self.thresholds.enable_distance_alert
            && distances.min() < self.thresholds.distance_threshold;

        AlertEvaluation {
            angles,
            tangents,
            m,
            n,
            distances,
            angle_alert,
            distance_alert,
            alert: angle_alert || distance_alert,
        }
    }

    /// 4点を直接指定して評価
    pub fn evaluate_points(&self, a: Point2D, b: Point2D, c: Point2D, d: Point2D) -> AlertEvaluation {
        self.evaluate(&Configuration::from_points(a, b, c, d))
    }
}
