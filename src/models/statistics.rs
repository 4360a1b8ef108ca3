use std::collections::BTreeMap;
use serde::Serialize;

use crate::models::{
    alert::AlertEvaluation,
    angle_error::{AngleKind, NoisyAngleReport, RangeErrorPoint},
    common::math_utils,
};

/// 誤差リストの要約統計
///
/// 標準偏差は母標準偏差。空のリストは全て0になります。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

impl ErrorSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            count,
            mean,
            std_dev: variance.sqrt(),
            max,
        }
    }

    /// ラジアン値を度に変換した要約
    pub fn to_degrees(&self) -> Self {
        Self {
            count: self.count,
            mean: math_utils::rad_to_deg(self.mean),
            std_dev: math_utils::rad_to_deg(self.std_dev),
            max: math_utils::rad_to_deg(self.max),
        }
    }
}

/// 実行中に単調増加する集計値
///
/// シミュレーションエンジンのみが所有し、更新します。
#[derive(Debug, Clone, Default)]
pub struct RunAccumulator {
    pub step_count: u64,
    pub alert_count: u64,
    pub angle_alert_count: u64,
    pub distance_alert_count: u64,
    /// 角度種別ごとの誤差リスト（ラジアン）
    pub angle_errors: BTreeMap<AngleKind, Vec<f64>>,
    /// 距離−誤差の組
    pub range_errors: Vec<RangeErrorPoint>,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1ステップ分の結果を追加
    pub fn record(&mut self, evaluation: &AlertEvaluation, noisy: &NoisyAngleReport) {
        self.step_count += 1;
        if evaluation.alert {
            self.alert_count += 1;
        }
        if evaluation.angle_alert {
            self.angle_alert_count += 1;
        }
        if evaluation.distance_alert {
            self.distance_alert_count += 1;
        }

        for sample in &noisy.samples {
            self.angle_errors.entry(sample.kind).or_default().push(sample.error);
        }
        self.range_errors.extend_from_slice(&noisy.range_errors);
    }

    /// 現在の集計値から統計を算出
    pub fn summarize(&self) -> RunStatistics {
        let per_angle = self
            .angle_errors
            .iter()
            .map(|(kind, errors)| (*kind, ErrorSummary::from_samples(errors)))
            .collect();

        let combined_errors: Vec<f64> = self.range_errors.iter().map(|p| p.error).collect();

        RunStatistics {
            step_count: self.step_count,
            alert_count: self.alert_count,
            angle_alert_count: self.angle_alert_count,
            distance_alert_count: self.distance_alert_count,
            alert_rate: alert_rate(self.alert_count, self.step_count),
            per_angle,
            combined: ErrorSummary::from_samples(&combined_errors),
            angle_errors: self.angle_errors.clone(),
            range_errors: self.range_errors.clone(),
        }
    }
}

fn alert_rate(alert_count: u64, step_count: u64) -> f64 {
    if step_count == 0 {
        0.0
    } else {
        alert_count as f64 / step_count as f64
    }
}

/// 確定した実行統計（ラジアン）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub step_count: u64,
    pub alert_count: u64,
    pub angle_alert_count: u64,
    pub distance_alert_count: u64,
    /// alert_count / step_count（0ステップの場合は0）
    pub alert_rate: f64,
    /// 角度種別ごとの誤差要約
    pub per_angle: BTreeMap<AngleKind, ErrorSummary>,
    /// 距離−誤差の組全体の誤差要約
    pub combined: ErrorSummary,
    #[serde(skip)]
    pub angle_errors: BTreeMap<AngleKind, Vec<f64>>,
    #[serde(skip)]
    pub range_errors: Vec<RangeErrorPoint>,
}

impl RunStatistics {
    /// 角度種別の誤差要約（記録がなければNone）
    pub fn summary_of(&self, kind: AngleKind) -> Option<&ErrorSummary> {
        self.per_angle.get(&kind)
    }

    /// 結果をコンソールに表示（度単位）
    pub fn print_report(&self) {
        println!("=== 実行結果 ===");
        println!("総ステップ数: {}", self.step_count);
        println!("総警報数: {} (角度: {}, 距離: {})",
                 self.alert_count, self.angle_alert_count, self.distance_alert_count);
        println!("警報率: {:.2}%", self.alert_rate * 100.0);

        if self.per_angle.is_empty() {
            return;
        }

        println!();
        println!("=== 角度誤差 (度) ===");
        for (kind, summary) in &self.per_angle {
            let deg = summary.to_degrees();
            println!("  {}: 平均 {:.2}°, 標準偏差 {:.2}°, 最大 {:.2}° ({}件)",
                     kind, deg.mean, deg.std_dev, deg.max, deg.count);
        }

        let combined = self.combined.to_degrees();
        println!("  全体: 平均 {:.2}°, 標準偏差 {:.2}°, 最大 {:.2}° ({}件)",
                 combined.mean, combined.std_dev, combined.max, combined.count);
    }
}
