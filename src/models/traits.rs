use crate::models::common::{Configuration, Point2D};
use crate::models::measurement::NoisyMeasurement;

/// 配置（A, B, C, D）の供給元インターフェース
///
/// ファイル再生、モンテカルロ生成、系統的スイープのいずれでも、
/// エンジンはステップ毎の配置列としてのみ扱います。
pub trait IConfigurationSource: Iterator<Item = Configuration> {
    /// 供給元の説明（ログ・表示用）
    fn describe(&self) -> String;

    /// 供給予定のステップ数（不明な場合はNone）
    fn expected_steps(&self) -> Option<u64>;
}

/// 距離計測センサーのインターフェース
///
/// 観測者から対象までの距離をノイズ付きで計測し、真の方位上に再投影した点を返します。
pub trait IRangeSensor {
    /// 観測者から対象への1回の計測
    fn measure(&mut self, observer: &Point2D, target: &Point2D) -> NoisyMeasurement;

    /// 計測ノイズの標準偏差（m）
    fn get_noise_stddev(&self) -> f64;

    /// これまでの計測回数
    fn get_measurement_count(&self) -> u64;
}
