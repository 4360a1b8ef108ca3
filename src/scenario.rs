use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;

use crate::models::{
    alert::AlertThresholds,
    angle_error::NoiseScheme,
    generators::SweepSource,
    measurement::DEFAULT_NOISE_STDDEV,
    segment_log::SourceError,
};

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 乱数シード（省略時はエントロピーから決定）
    #[serde(default)]
    pub seed: Option<u64>,
    /// 処理する最大ステップ数（省略時は供給元が尽きるまで）
    #[serde(default)]
    pub max_steps: Option<u64>,
}

/// 距離計測設定
#[derive(Debug, Deserialize, Serialize)]
pub struct MeasurementConfig {
    #[serde(default = "default_noise_stddev")]
    pub noise_stddev: f64,
    #[serde(default)]
    pub scheme: NoiseScheme,
}

fn default_noise_stddev() -> f64 {
    DEFAULT_NOISE_STDDEV
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            noise_stddev: DEFAULT_NOISE_STDDEV,
            scheme: NoiseScheme::default(),
        }
    }
}

/// 配置の供給元設定
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 線分ログの再生
    Replay {
        path: PathBuf,
    },
    /// モンテカルロ生成
    MonteCarlo {
        count: u64,
        #[serde(default = "default_forklift_length")]
        forklift_length: f64,
        #[serde(default = "default_monte_carlo_max_distance")]
        max_distance: f64,
    },
    /// 系統的スイープ
    Sweep {
        #[serde(default = "default_forklift_length")]
        forklift_length: f64,
        #[serde(default = "default_sweep_min_distance")]
        min_distance: f64,
        #[serde(default = "default_sweep_max_distance")]
        max_distance: f64,
        #[serde(default = "default_sweep_distance_step")]
        distance_step: f64,
        #[serde(default = "default_sweep_rotation_step_deg")]
        rotation_step_deg: u32,
    },
    /// ランダム2台配置
    RandomPairs {
        count: u64,
        #[serde(default = "default_random_half_length")]
        half_length: f64,
        #[serde(default = "default_random_max_distance")]
        max_distance: f64,
    },
}

fn default_forklift_length() -> f64 { 3.0 }
fn default_monte_carlo_max_distance() -> f64 { 25.0 }
fn default_sweep_min_distance() -> f64 { 3.5 }
fn default_sweep_max_distance() -> f64 { 28.0 }
fn default_sweep_distance_step() -> f64 { 0.5 }
fn default_sweep_rotation_step_deg() -> u32 { 10 }
fn default_random_half_length() -> f64 { 1.5 }
fn default_random_max_distance() -> f64 { 12.5 }

impl SourceConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SourceConfig::Replay { .. } => "replay",
            SourceConfig::MonteCarlo { .. } => "monte_carlo",
            SourceConfig::Sweep { .. } => "sweep",
            SourceConfig::RandomPairs { .. } => "random_pairs",
        }
    }
}

/// 完全なシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimulationConfig,
    #[serde(default)]
    pub alert: AlertThresholds,
    #[serde(default)]
    pub measurement: MeasurementConfig,
    pub source: SourceConfig,
    /// シナリオファイルのあるディレクトリ（相対パス解決用）
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let mut config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 再生ファイルのパスをシナリオファイル基準で解決
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let alert = &self.alert;
        if !alert.angle_threshold.is_finite() || alert.angle_threshold <= 0.0 {
            return Err(ScenarioError::ValidationError("angle_threshold must be positive".to_string()));
        }
        if !alert.distance_threshold.is_finite() || alert.distance_threshold <= 0.0 {
            return Err(ScenarioError::ValidationError("distance_threshold must be positive".to_string()));
        }

        let noise = self.measurement.noise_stddev;
        if !noise.is_finite() || noise < 0.0 {
            return Err(ScenarioError::ValidationError("noise_stddev must be non-negative".to_string()));
        }

        if self.sim.max_steps == Some(0) {
            return Err(ScenarioError::ValidationError("max_steps must be positive".to_string()));
        }

        match &self.source {
            SourceConfig::Replay { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ScenarioError::ValidationError("replay path must not be empty".to_string()));
                }
            }
            SourceConfig::MonteCarlo { count, forklift_length, max_distance } => {
                check_count(*count)?;
                check_positive("forklift_length", *forklift_length)?;
                check_positive("max_distance", *max_distance)?;
            }
            SourceConfig::Sweep { forklift_length, min_distance, max_distance, distance_step, rotation_step_deg } => {
                check_positive("forklift_length", *forklift_length)?;
                check_positive("distance_step", *distance_step)?;
                if !min_distance.is_finite() || *min_distance < 0.0 {
                    return Err(ScenarioError::ValidationError("min_distance must be non-negative".to_string()));
                }
                check_positive("max_distance", *max_distance)?;
                if min_distance > max_distance {
                    return Err(ScenarioError::ValidationError(
                        format!("min_distance {} > max_distance {}", min_distance, max_distance)
                    ));
                }
                if *rotation_step_deg == 0 || *rotation_step_deg > 360 {
                    return Err(ScenarioError::ValidationError("rotation_step_deg must be in 1..=360".to_string()));
                }
                let sweep = SweepSource::new(*forklift_length, *min_distance, *max_distance, *distance_step, *rotation_step_deg);
                if sweep.total_steps().is_none() {
                    return Err(ScenarioError::ValidationError(
                        format!("sweep step count overflows (distance_step {})", distance_step)
                    ));
                }
            }
            SourceConfig::RandomPairs { count, half_length, max_distance } => {
                check_count(*count)?;
                check_positive("half_length", *half_length)?;
                if !max_distance.is_finite() || *max_distance < 0.0 {
                    return Err(ScenarioError::ValidationError("max_distance must be non-negative".to_string()));
                }
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        match self.sim.seed {
            Some(seed) => println!("シード値: {}", seed),
            None => println!("シード値: (自動)"),
        }
        if let Some(max_steps) = self.sim.max_steps {
            println!("最大ステップ数: {}", max_steps);
        }
        println!();

        println!("=== 警報判定 ===");
        println!("角度閾値 (|m|, |n|): {}", self.alert.angle_threshold);
        if self.alert.enable_distance_alert {
            println!("距離閾値: {:.2}m", self.alert.distance_threshold);
        } else {
            println!("距離閾値: 無効");
        }
        println!();

        println!("=== 距離計測 ===");
        println!("ノイズ標準偏差: {:.2}m", self.measurement.noise_stddev);
        println!("推定方式: {}", self.measurement.scheme.describe());
        println!();

        println!("=== 配置の供給元 ===");
        match &self.source {
            SourceConfig::Replay { path } => {
                println!("線分ログ再生: {}", self.resolve_path(path).display());
            }
            SourceConfig::MonteCarlo { count, forklift_length, max_distance } => {
                println!("モンテカルロ: {}回 (車長 {:.1}m, 最大距離 {:.1}m)", count, forklift_length, max_distance);
            }
            SourceConfig::Sweep { forklift_length, min_distance, max_distance, distance_step, rotation_step_deg } => {
                println!("系統的スイープ: 距離 {:.1}〜{:.1}m ({:.2}m刻み), 回転 {}°刻み (車長 {:.1}m)",
                         min_distance, max_distance, distance_step, rotation_step_deg, forklift_length);
            }
            SourceConfig::RandomPairs { count, half_length, max_distance } => {
                println!("ランダム2台配置: {}回 (半長 {:.2}m, 最大距離 {:.1}m)", count, half_length, max_distance);
            }
        }
    }
}

fn check_count(count: u64) -> Result<(), ScenarioError> {
    if count == 0 {
        return Err(ScenarioError::ValidationError("count must be positive".to_string()));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), ScenarioError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ScenarioError::ValidationError(format!("{} must be positive", name)));
    }
    Ok(())
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(PathBuf),
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    ValidationError(String),
    Source(SourceError),
    Measurement(crate::models::measurement::MeasurementError),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
            ScenarioError::Source(err) => {
                write!(f, "配置の供給元エラー: {}", err)
            }
            ScenarioError::Measurement(err) => {
                write!(f, "計測設定エラー: {}", err)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<SourceError> for ScenarioError {
    fn from(err: SourceError) -> Self {
        ScenarioError::Source(err)
    }
}

impl From<crate::models::measurement::MeasurementError> for ScenarioError {
    fn from(err: crate::models::measurement::MeasurementError) -> Self {
        ScenarioError::Measurement(err)
    }
}
