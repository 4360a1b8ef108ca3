use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::trace;

use crate::models::{
    common::Point2D,
    geometry,
    traits::IRangeSensor,
};

/// 距離計測ノイズの標準偏差の既定値（m）
pub const DEFAULT_NOISE_STDDEV: f64 = 0.5;

/// ノイズ付き計測結果
///
/// 方位は真値のまま、半径方向の距離のみが誤差を含みます。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisyMeasurement {
    /// 観測者の位置
    pub observer: Point2D,
    /// 計測対象の真の位置
    pub target: Point2D,
    /// 計測距離から再構成した対象位置
    pub point: Point2D,
    /// 真の距離（m）
    pub true_distance: f64,
    /// ノイズを含む計測距離（m、負値もあり得る）
    pub measured_distance: f64,
}

/// 観測者から対象への方位に沿って、指定距離の位置を求める
///
/// `measured_distance` が負の場合は観測者を挟んだ反対側の点になります。
/// 真の距離が0の場合は方位が定まらないため、観測者の位置をそのまま返します。
pub fn project_along_bearing(observer: &Point2D, target: &Point2D, measured_distance: f64) -> Point2D {
    let true_distance = geometry::distance(observer, target);
    if true_distance == 0.0 {
        return *observer;
    }

    let ratio = measured_distance / true_distance;
    if ratio == 1.0 {
        return *target;
    }

    *observer + (*target - *observer) * ratio
}

/// ノイズ付き計測点を生成
///
/// 計測距離は平均＝真の距離、標準偏差 `noise_stddev` の正規分布から引きます。
/// 乱数は真の距離が0の場合も1回消費されます。
///
/// # 戻り値
///
/// (再構成された点, 真の距離)
pub fn noisy_point<R: Rng + ?Sized>(
    observer: &Point2D,
    target: &Point2D,
    noise_stddev: f64,
    rng: &mut R,
) -> (Point2D, f64) {
    let measurement = measure_with(observer, target, noise_stddev, rng);
    (measurement.point, measurement.true_distance)
}

fn measure_with<R: Rng + ?Sized>(
    observer: &Point2D,
    target: &Point2D,
    noise_stddev: f64,
    rng: &mut R,
) -> NoisyMeasurement {
    let true_distance = geometry::distance(observer, target);
    let z: f64 = rng.sample(StandardNormal);
    let measured_distance = true_distance + noise_stddev * z;

    NoisyMeasurement {
        observer: *observer,
        target: *target,
        point: project_along_bearing(observer, target, measured_distance),
        true_distance,
        measured_distance,
    }
}

/// 距離計測ノイズ設定エラー
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementError {
    InvalidNoiseStddev(f64),
}

impl std::fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementError::InvalidNoiseStddev(value) => {
                write!(f, "ノイズ標準偏差は0以上の有限値である必要があります: {}", value)
            }
        }
    }
}

impl std::error::Error for MeasurementError {}

/// ガウスノイズ付き距離センサー
///
/// 乱数生成器を実行ごとに所有するため、独立した実行同士で状態を共有しません。
#[derive(Debug, Clone)]
pub struct RangeSensor<R = ChaCha8Rng> {
    noise_stddev: f64,
    rng: R,
    measurement_count: u64,
}

impl RangeSensor<ChaCha8Rng> {
    /// シード指定のセンサーを作成（再現性のある実行用）
    pub fn seeded(noise_stddev: f64, seed: u64) -> Result<Self, MeasurementError> {
        Self::with_rng(noise_stddev, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> RangeSensor<R> {
    /// 任意の乱数生成器を注入してセンサーを作成
    pub fn with_rng(noise_stddev: f64, rng: R) -> Result<Self, MeasurementError> {
        if !noise_stddev.is_finite() || noise_stddev < 0.0 {
            return Err(MeasurementError::InvalidNoiseStddev(noise_stddev));
        }

        Ok(Self {
            noise_stddev,
            rng,
            measurement_count: 0,
        })
    }
}

impl<R: Rng> IRangeSensor for RangeSensor<R> {
    fn measure(&mut self, observer: &Point2D, target: &Point2D) -> NoisyMeasurement {
        let measurement = measure_with(observer, target, self.noise_stddev, &mut self.rng);
        self.measurement_count += 1;

        trace!(
            "計測 {} -> {}: 真値 {:.3}m, 計測値 {:.3}m",
            observer,
            target,
            measurement.true_distance,
            measurement.measured_distance
        );

        measurement
    }

    fn get_noise_stddev(&self) -> f64 {
        self.noise_stddev
    }

    fn get_measurement_count(&self) -> u64 {
        self.measurement_count
    }
}
