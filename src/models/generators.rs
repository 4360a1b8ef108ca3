//! # Generators モジュール
//!
//! 配置（A, B, C, D）を乱数または系統的な走査で生成する供給元を提供します。
//!
//! - [`MonteCarloSource`]: 1台目を原点に固定し、2台目の位置・向きを一様乱数で配置
//! - [`SweepSource`]: 1台目を x 軸上に固定し、2台目を距離・方位・向きの格子で走査
//! - [`RandomPairSource`]: 2台とも中心位置を乱数で配置し、中心方位の向きに置く
//!
//! 各供給元は自身の乱数生成器を所有し、ノイズ計測用の乱数とは独立しています。

use std::f64::consts::TAU;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::models::{
    common::{Body, Configuration, Point2D, math_utils},
    traits::IConfigurationSource,
};

/// モンテカルロ配置生成
#[derive(Debug, Clone)]
pub struct MonteCarloSource {
    pub count: u64,
    pub forklift_length: f64,
    pub max_distance: f64,
    generated: u64,
    rng: ChaCha8Rng,
}

impl MonteCarloSource {
    pub fn new(count: u64, forklift_length: f64, max_distance: f64, rng: ChaCha8Rng) -> Self {
        Self {
            count,
            forklift_length,
            max_distance,
            generated: 0,
            rng,
        }
    }

    pub fn seeded(count: u64, forklift_length: f64, max_distance: f64, seed: u64) -> Self {
        Self::new(count, forklift_length, max_distance, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Iterator for MonteCarloSource {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.generated >= self.count {
            return None;
        }
        self.generated += 1;

        let a = Point2D::origin();
        let heading_ab = self.rng.gen_range(0.0..TAU);
        let b = Point2D::from_polar(a, self.forklift_length, heading_ab);

        let center_distance = self.rng.gen_range(0.0..self.max_distance);
        let center_bearing = self.rng.gen_range(0.0..TAU);
        let center_cd = Point2D::from_polar(a, center_distance, center_bearing);
        let heading_cd = self.rng.gen_range(0.0..TAU);

        Some(Configuration::new(
            Body::new(a, b),
            Body::from_center(center_cd, self.forklift_length / 2.0, heading_cd),
        ))
    }
}

impl IConfigurationSource for MonteCarloSource {
    fn describe(&self) -> String {
        format!(
            "モンテカルロ生成: {}回 (車長 {:.1}m, 最大距離 {:.1}m)",
            self.count, self.forklift_length, self.max_distance
        )
    }

    fn expected_steps(&self) -> Option<u64> {
        Some(self.count)
    }
}

/// 系統的スイープ配置生成
///
/// 1台目は A = 原点、B = (車長, 0) に固定。2台目の中心を1台目の中心から
/// 距離 `min_distance + i·distance_step`（`max_distance + 0.01` 未満）、
/// 方位 0〜360° を `rotation_step_deg` 刻みで置き、各位置で向きも同じ刻みで回します。
#[derive(Debug, Clone)]
pub struct SweepSource {
    pub forklift_length: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub distance_step: f64,
    pub rotation_step_deg: u32,
    distance_count: u64,
    rotation_count: u64,
    index: u64,
}

impl SweepSource {
    pub fn new(
        forklift_length: f64,
        min_distance: f64,
        max_distance: f64,
        distance_step: f64,
        rotation_step_deg: u32,
    ) -> Self {
        let span = max_distance + 0.01 - min_distance;
        let distance_count = if span > 0.0 && distance_step > 0.0 {
            (span / distance_step).ceil() as u64
        } else {
            0
        };
        let rotation_count = if rotation_step_deg > 0 {
            u64::from(360_u32.div_ceil(rotation_step_deg))
        } else {
            0
        };

        Self {
            forklift_length,
            min_distance,
            max_distance,
            distance_step,
            rotation_step_deg,
            distance_count,
            rotation_count,
            index: 0,
        }
    }

    /// 走査する総配置数（u64 に収まらない場合はNone）
    pub fn total_steps(&self) -> Option<u64> {
        self.distance_count
            .checked_mul(self.rotation_count)?
            .checked_mul(self.rotation_count)
    }

    fn configuration_at(&self, index: u64) -> Configuration {
        let per_distance = self.rotation_count * self.rotation_count;
        let distance_index = index / per_distance;
        let bearing_index = (index % per_distance) / self.rotation_count;
        let heading_index = index % self.rotation_count;

        let a = Point2D::origin();
        let b = Point2D::new(self.forklift_length, 0.0);
        let center_ab = a.midpoint(&b);

        let distance = self.min_distance + distance_index as f64 * self.distance_step;
        let bearing = math_utils::deg_to_rad((bearing_index * u64::from(self.rotation_step_deg)) as f64);
        let heading = math_utils::deg_to_rad((heading_index * u64::from(self.rotation_step_deg)) as f64);

        let center_cd = Point2D::from_polar(center_ab, distance, bearing);

        Configuration::new(
            Body::new(a, b),
            Body::from_center(center_cd, self.forklift_length / 2.0, heading),
        )
    }
}

impl Iterator for SweepSource {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.total_steps()?;
        if self.index >= total {
            return None;
        }
        let config = self.configuration_at(self.index);
        self.index += 1;
        Some(config)
    }
}

impl IConfigurationSource for SweepSource {
    fn describe(&self) -> String {
        format!(
            "系統的スイープ: 距離 {:.1}〜{:.1}m ({:.2}m刻み), 回転 {}°刻み, 計{}配置",
            self.min_distance,
            self.max_distance,
            self.distance_step,
            self.rotation_step_deg,
            self.total_steps().map_or_else(|| "過大".to_string(), |total| total.to_string())
        )
    }

    fn expected_steps(&self) -> Option<u64> {
        self.total_steps()
    }
}

/// ランダム2台配置生成（線分ログ生成用）
///
/// 各台の中心を距離 [0, max_distance]・方位一様で置き、中心方位の向きに
/// 中心 ± 半長·(cos, sin) の端点を持たせます。
#[derive(Debug, Clone)]
pub struct RandomPairSource {
    pub count: u64,
    pub half_length: f64,
    pub max_distance: f64,
    generated: u64,
    rng: ChaCha8Rng,
}

impl RandomPairSource {
    pub fn new(count: u64, half_length: f64, max_distance: f64, rng: ChaCha8Rng) -> Self {
        Self {
            count,
            half_length,
            max_distance,
            generated: 0,
            rng,
        }
    }

    pub fn seeded(count: u64, half_length: f64, max_distance: f64, seed: u64) -> Self {
        Self::new(count, half_length, max_distance, ChaCha8Rng::seed_from_u64(seed))
    }

    fn random_body(&mut self) -> Body {
        let bearing = self.rng.gen_range(0.0..=TAU);
        let distance = self.rng.gen_range(0.0..=self.max_distance);
        let center = Point2D::from_polar(Point2D::origin(), distance, bearing);
        Body::from_center(center, self.half_length, bearing)
    }
}

impl Iterator for RandomPairSource {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.generated >= self.count {
            return None;
        }
        self.generated += 1;

        let body1 = self.random_body();
        let body2 = self.random_body();
        Some(Configuration::new(body1, body2))
    }
}

impl IConfigurationSource for RandomPairSource {
    fn describe(&self) -> String {
        format!(
            "ランダム2台配置: {}回 (半長 {:.2}m, 最大距離 {:.1}m)",
            self.count, self.half_length, self.max_distance
        )
    }

    fn expected_steps(&self) -> Option<u64> {
        Some(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry;

    #[test]
    fn test_monte_carlo_geometry() {
        let source = MonteCarloSource::seeded(500, 3.0, 25.0, 1);
        let configs: Vec<Configuration> = source.collect();
        assert_eq!(configs.len(), 500);

        for config in &configs {
            assert_eq!(config.a(), Point2D::origin());
            assert!((config.body1.length() - 3.0).abs() < 1e-9);
            assert!((config.body2.length() - 3.0).abs() < 1e-9);
            assert!(geometry::distance(&config.a(), &config.body2.center()) < 25.0 + 1e-9);
        }
    }

    #[test]
    fn test_monte_carlo_is_reproducible() {
        let first: Vec<Configuration> = MonteCarloSource::seeded(20, 3.0, 25.0, 99).collect();
        let second: Vec<Configuration> = MonteCarloSource::seeded(20, 3.0, 25.0, 99).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sweep_dimensions() {
        let sweep = SweepSource::new(3.0, 3.5, 28.0, 0.5, 10);
        // 距離 3.5〜28.0 の50通り × 方位36 × 向き36
        assert_eq!(sweep.total_steps(), Some(50 * 36 * 36));
        assert_eq!(sweep.expected_steps(), Some(64800));
    }

    #[test]
    fn test_sweep_with_tiny_step_does_not_overflow() {
        let mut sweep = SweepSource::new(3.0, 3.5, 28.0, 1e-18, 10);
        assert_eq!(sweep.total_steps(), None);
        assert_eq!(sweep.expected_steps(), None);
        assert!(sweep.next().is_none());
        assert!(sweep.describe().contains("過大"));
    }

    #[test]
    fn test_sweep_ordering() {
        let mut sweep = SweepSource::new(3.0, 3.5, 28.0, 0.5, 90);
        let first = sweep.next().unwrap();
        assert_eq!(first.a(), Point2D::origin());
        assert_eq!(first.b(), Point2D::new(3.0, 0.0));
        // 中心 (1.5 + 3.5, 0)、向き 0
        assert!((first.c().x - 6.5).abs() < 1e-12);
        assert!((first.d().x - 3.5).abs() < 1e-12);

        // 2番目は向きのみ 90° 回転
        let second = sweep.next().unwrap();
        assert!((second.body2.center().x - 5.0).abs() < 1e-12);
        assert!((second.c().y - 1.5).abs() < 1e-12);

        let rest = sweep.count();
        assert_eq!(rest as u64, 50 * 4 * 4 - 2);
    }

    #[test]
    fn test_sweep_last_distance() {
        let sweep = SweepSource::new(3.0, 3.5, 28.0, 0.5, 180);
        let last = sweep.last().unwrap();
        let center_ab = Point2D::new(1.5, 0.0);
        assert!((geometry::distance(&center_ab, &last.body2.center()) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_pairs() {
        let configs: Vec<Configuration> = RandomPairSource::seeded(100, 1.5, 12.5, 3).collect();
        assert_eq!(configs.len(), 100);
        for config in &configs {
            assert!((config.body1.length() - 3.0).abs() < 1e-9);
            assert!((config.body2.length() - 3.0).abs() < 1e-9);
            assert!(config.body1.center().magnitude() <= 12.5 + 1e-9);
        }
    }
}
