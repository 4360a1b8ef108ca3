// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 配置供給元・距離センサーのインターフェース（trait）定義
pub mod traits;

// 幾何プリミティブ、計測ノイズ、角度誤差、警報判定
pub mod geometry;
pub mod measurement;
pub mod angle_error;
pub mod alert;

// 集計
pub mod statistics;

// 配置の供給元
pub mod segment_log;
pub mod generators;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use alert::{AlertEvaluation, AlertEvaluator, AlertThresholds, CrossDistances, Tangents, TriangleAngles};
pub use angle_error::{AngleErrorSample, AngleKind, NoiseScheme, NoisyAngleReport, RangeErrorPoint, angular_error};
pub use measurement::{MeasurementError, NoisyMeasurement, RangeSensor, noisy_point};
pub use statistics::{ErrorSummary, RunAccumulator, RunStatistics};
pub use segment_log::{SegmentLog, SourceError, write_segment_log};
pub use generators::{MonteCarloSource, RandomPairSource, SweepSource};
