//! # Simulation モジュール
//!
//! フォークリフト警報解析のシミュレーションエンジンを提供します。
//!
//! エンジンは配置の供給元から (A, B, C, D) を1ステップずつ受け取り、
//! 幾何計算 → ノイズ付き計測 → 角度誤差 → 警報判定の順に評価して、
//! 結果を集計器に蓄積します。実行は完全に逐次的で、各ステップは
//! 後続ステップの結果に依存しません。
//!
//! ## ライフサイクル
//!
//! 1. **Running**: `step()` で配置を受け付ける
//! 2. **Finalized**: `finalize()` 以降は読み取り専用。`step()` はエラーになる
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use forksim::scenario::ScenarioConfig;
//! use forksim::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/monte_carlo.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1)?;
//! let stats = engine.run()?;
//! stats.print_report();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, trace};

use crate::models::*;
use crate::models::angle_error::estimate_noisy_angles;
use crate::scenario::{ScenarioConfig, SourceConfig};

/// 生成系供給元の乱数シードをノイズ用シードからずらす量
const GENERATOR_SEED_OFFSET: u64 = 0x5EED_0F0F;

/// 進行状況を表示するステップ間隔
const PROGRESS_INTERVAL: u64 = 100;

/// エンジンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// ステップ受付中
    Running,
    /// 確定済み（読み取り専用）
    Finalized,
}

/// 1ステップの評価結果
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// 1始まりのステップ番号
    pub step: u64,
    pub configuration: Configuration,
    pub evaluation: AlertEvaluation,
    pub noisy: NoisyAngleReport,
}

/// シミュレーションエラー
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// 確定後にステップが呼ばれた
    AlreadyFinalized { attempted_step: u64 },
    /// 供給元が未設定のまま実行しようとした
    MissingSource,
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::AlreadyFinalized { attempted_step } => {
                write!(f, "確定済みの実行にステップ {} を追加しようとしました", attempted_step)
            }
            SimulationError::MissingSource => {
                write!(f, "配置の供給元が設定されていません")
            }
        }
    }
}

impl std::error::Error for SimulationError {}

/// エンジン設定
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub thresholds: AlertThresholds,
    pub scheme: NoiseScheme,
    pub max_steps: Option<u64>,
    pub verbose_level: u8,
}

pub struct SimulationEngine {
    options: EngineOptions,
    seed: u64,
    state: RunState,

    evaluator: AlertEvaluator,
    sensor: Box<dyn IRangeSensor>,
    source: Option<Box<dyn IConfigurationSource>>,
    accumulator: RunAccumulator,
    statistics: Option<RunStatistics>,

    scenario_config: Option<ScenarioConfig>,
}

impl SimulationEngine {
    /// シナリオからエンジンを作成
    ///
    /// シードが未指定の場合はここで決定し、ログに出力します。
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Result<Self, crate::scenario::ScenarioError> {
        let seed = scenario.sim.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            info!("シード値を自動決定しました: {}", seed);
            seed
        });

        let sensor = RangeSensor::seeded(scenario.measurement.noise_stddev, seed)?;

        let options = EngineOptions {
            thresholds: scenario.alert,
            scheme: scenario.measurement.scheme,
            max_steps: scenario.sim.max_steps,
            verbose_level,
        };

        let mut engine = Self::with_sensor(options, Box::new(sensor));
        engine.seed = seed;
        engine.scenario_config = Some(scenario);
        Ok(engine)
    }

    /// 任意のセンサーを注入してエンジンを作成
    pub fn with_sensor(options: EngineOptions, sensor: Box<dyn IRangeSensor>) -> Self {
        Self {
            options,
            seed: 0,
            state: RunState::Running,
            evaluator: AlertEvaluator::new(options.thresholds),
            sensor,
            source: None,
            accumulator: RunAccumulator::new(),
            statistics: None,
            scenario_config: None,
        }
    }

    /// シナリオの供給元を構築
    pub fn initialize(&mut self) -> Result<(), crate::scenario::ScenarioError> {
        let Some(scenario) = &self.scenario_config else {
            return Ok(());
        };

        let generator_rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(GENERATOR_SEED_OFFSET));

        let source: Box<dyn IConfigurationSource> = match &scenario.source {
            SourceConfig::Replay { path } => {
                let log = SegmentLog::from_file(scenario.resolve_path(path))?;
                if self.options.verbose_level > 1 {
                    debug!("線分ログ: {}配置 (読み飛ばし {}行)", log.len(), log.skipped_lines);
                }
                Box::new(log)
            }
            SourceConfig::MonteCarlo { count, forklift_length, max_distance } => {
                Box::new(MonteCarloSource::new(*count, *forklift_length, *max_distance, generator_rng))
            }
            SourceConfig::Sweep { forklift_length, min_distance, max_distance, distance_step, rotation_step_deg } => {
                Box::new(SweepSource::new(*forklift_length, *min_distance, *max_distance, *distance_step, *rotation_step_deg))
            }
            SourceConfig::RandomPairs { count, half_length, max_distance } => {
                Box::new(RandomPairSource::new(*count, *half_length, *max_distance, generator_rng))
            }
        };

        if self.options.verbose_level > 0 {
            info!("初期化完了:");
            info!("  供給元: {}", source.describe());
            info!("  推定方式: {}", self.options.scheme.describe());
            info!("  ノイズ標準偏差: {:.2}m", self.sensor.get_noise_stddev());
            info!("  シード値: {}", self.seed);
        }

        self.source = Some(source);
        Ok(())
    }

    /// 初期化済みの供給元を最後まで（または最大ステップ数まで）処理して確定
    pub fn run(&mut self) -> Result<RunStatistics, Box<dyn std::error::Error>> {
        if self.source.is_none() {
            self.initialize()?;
        }
        let mut source = self.source.take().ok_or(SimulationError::MissingSource)?;
        let stats = self.run_source(source.as_mut())?;
        Ok(stats)
    }

    /// 任意の供給元を処理して確定
    pub fn run_source(&mut self, source: &mut dyn IConfigurationSource) -> Result<RunStatistics, SimulationError> {
        info!("=== シミュレーション実行開始 ===");

        let expected = match (source.expected_steps(), self.options.max_steps) {
            (Some(expected), Some(limit)) => Some(expected.min(limit)),
            (expected, limit) => expected.or(limit),
        };

        loop {
            if let Some(limit) = self.options.max_steps {
                if self.accumulator.step_count >= limit {
                    break;
                }
            }
            let Some(configuration) = source.next() else {
                break;
            };

            self.step(configuration)?;

            let step_count = self.accumulator.step_count;
            if step_count % PROGRESS_INTERVAL == 0 && self.options.verbose_level > 0 {
                match expected {
                    Some(total) if total > 0 => {
                        let progress = step_count as f64 / total as f64 * 100.0;
                        info!("進行状況: {:.1}% ({}/{}ステップ)", progress, step_count, total);
                    }
                    _ => info!("進行状況: {}ステップ", step_count),
                }
            }
        }

        let stats = self.finalize().clone();

        info!("=== シミュレーション完了 ===");
        info!("総ステップ数: {}", stats.step_count);
        info!("総警報数: {}", stats.alert_count);

        Ok(stats)
    }

    /// 1配置を評価して集計に加える
    pub fn step(&mut self, configuration: Configuration) -> Result<StepResult, SimulationError> {
        let step = self.accumulator.step_count + 1;

        if self.state == RunState::Finalized {
            error!("確定済みの実行へのステップ追加: ステップ {}", step);
            return Err(SimulationError::AlreadyFinalized { attempted_step: step });
        }

        let evaluation = self.evaluator.evaluate(&configuration);
        let noisy = estimate_noisy_angles(
            self.options.scheme,
            &configuration,
            &evaluation.angles,
            self.sensor.as_mut(),
        );

        self.accumulator.record(&evaluation, &noisy);

        if self.options.verbose_level > 2 {
            trace!(
                "ステップ {}: {} m={:.4} n={:.4} 警報={}",
                step,
                configuration,
                evaluation.m,
                evaluation.n,
                evaluation.alert
            );
        }

        Ok(StepResult {
            step,
            configuration,
            evaluation,
            noisy,
        })
    }

    /// 実行を確定して統計を返す
    ///
    /// 2回目以降の呼び出しは最初に確定した統計をそのまま返します。
    pub fn finalize(&mut self) -> &RunStatistics {
        if self.state == RunState::Running {
            self.state = RunState::Finalized;
            debug!("実行を確定しました ({}ステップ)", self.accumulator.step_count);
        }
        let accumulator = &self.accumulator;
        self.statistics.get_or_insert_with(|| accumulator.summarize())
    }

    /// 現在の状態
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 実行に使う設定（構築後は変更不可）
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// ノイズ計測に使うシード値
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 確定済みの統計（未確定ならNone）
    pub fn statistics(&self) -> Option<&RunStatistics> {
        self.statistics.as_ref()
    }

    /// 現在までのステップ数
    pub fn step_count(&self) -> u64 {
        self.accumulator.step_count
    }

    /// 現在までの警報数
    pub fn alert_count(&self) -> u64 {
        self.accumulator.alert_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    fn alerting() -> Configuration {
        Configuration::from_points(p(0.0, 0.0), p(3.0, 0.0), p(1.5, 5.0), p(1.5, -5.0))
    }

    fn quiet() -> Configuration {
        Configuration::from_points(p(0.0, 0.0), p(3.0, 0.0), p(10.0, 0.5), p(13.0, 0.5))
    }

    fn engine(scheme: NoiseScheme, seed: u64) -> SimulationEngine {
        let options = EngineOptions {
            scheme,
            ..EngineOptions::default()
        };
        let sensor = RangeSensor::seeded(0.5, seed).unwrap();
        SimulationEngine::with_sensor(options, Box::new(sensor))
    }

    #[test]
    fn test_alert_count_and_rate() {
        let mut engine = engine(NoiseScheme::None, 1);
        let configs = [alerting(), quiet(), quiet(), alerting(), quiet()];
        for config in configs {
            engine.step(config).unwrap();
        }

        let stats = engine.finalize();
        assert_eq!(stats.step_count, 5);
        assert_eq!(stats.alert_count, 2);
        assert!((stats.alert_rate - 0.4).abs() < 1e-12);
        assert!(stats.per_angle.is_empty());
    }

    #[test]
    fn test_step_after_finalize_fails() {
        let mut engine = engine(NoiseScheme::SixRange, 1);
        engine.step(quiet()).unwrap();
        engine.finalize();
        assert_eq!(engine.state(), RunState::Finalized);

        let err = engine.step(quiet()).unwrap_err();
        assert_eq!(err, SimulationError::AlreadyFinalized { attempted_step: 2 });
        assert_eq!(engine.statistics().unwrap().step_count, 1);
    }

    #[test]
    fn test_finalized_run_stays_closed() {
        let mut engine = engine(NoiseScheme::None, 2);
        assert_eq!(engine.state(), RunState::Running);
        engine.step(alerting()).unwrap();
        engine.finalize();

        // run_source も確定済みの実行を再開できない
        let mut source = MonteCarloSource::seeded(5, 3.0, 25.0, 1);
        assert_eq!(
            engine.run_source(&mut source),
            Err(SimulationError::AlreadyFinalized { attempted_step: 2 })
        );
        assert!(engine.step(quiet()).is_err());

        assert_eq!(engine.state(), RunState::Finalized);
        assert_eq!(engine.step_count(), 1);
        assert_eq!(engine.statistics().unwrap().step_count, 1);
        assert_eq!(engine.alert_count(), 1);
    }

    #[test]
    fn test_finalize_is_stable() {
        let mut engine = engine(NoiseScheme::SixRange, 4);
        engine.step(alerting()).unwrap();
        let first = engine.finalize().clone();
        let second = engine.finalize().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_noise_errors_are_collected_per_angle() {
        let mut engine = engine(NoiseScheme::SixRange, 7);
        for _ in 0..10 {
            engine.step(alerting()).unwrap();
        }

        let stats = engine.finalize();
        for kind in AngleKind::ALL {
            let summary = stats.summary_of(kind).unwrap();
            assert_eq!(summary.count, 10);
            assert!(summary.max <= std::f64::consts::PI);
            assert!(summary.mean >= 0.0);
        }
        assert_eq!(stats.combined.count, 60);
    }

    #[test]
    fn test_same_seed_same_statistics() {
        let run = |seed| {
            let mut engine = engine(NoiseScheme::FourRange, seed);
            let mut source = MonteCarloSource::seeded(200, 3.0, 25.0, 11);
            engine.run_source(&mut source).unwrap()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_max_steps_limits_run() {
        let options = EngineOptions {
            scheme: NoiseScheme::None,
            max_steps: Some(25),
            ..EngineOptions::default()
        };
        let sensor = RangeSensor::seeded(0.5, 1).unwrap();
        let mut engine = SimulationEngine::with_sensor(options, Box::new(sensor));

        let mut source = MonteCarloSource::seeded(100, 3.0, 25.0, 2);
        let stats = engine.run_source(&mut source).unwrap();
        assert_eq!(stats.step_count, 25);
    }

    #[test]
    fn test_run_from_scenario() {
        let yaml = r#"
meta: { version: "1.0", name: "sweep" }
sim: { seed: 3 }
measurement: { scheme: acb_only }
source: { type: sweep, rotation_step_deg: 90, min_distance: 3.5, max_distance: 5.0 }
"#;
        let scenario = ScenarioConfig::from_yaml_str(yaml).unwrap();
        let mut engine = SimulationEngine::new(scenario, 0).unwrap();
        let stats = engine.run().unwrap();

        // 距離 3.5, 4.0, 4.5, 5.0 × 方位4 × 向き4
        assert_eq!(stats.step_count, 64);
        assert_eq!(stats.summary_of(AngleKind::Acb).unwrap().count, 64);
        assert!(stats.summary_of(AngleKind::Cad).is_none());
        assert!(engine.step(quiet()).is_err());
    }
}
