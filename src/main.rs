use clap::{Arg, ArgMatches, Command};
use tracing::{error, info};

use forksim::logging::{LogConfig, LogOutput, init_logging, parse_log_level};
use forksim::models::*;
use forksim::scenario::ScenarioConfig;
use forksim::simulation::SimulationEngine;

/// 線分ログ生成時の既定値
const GENERATE_HALF_LENGTH: f64 = 1.5;
const GENERATE_MAX_DISTANCE: f64 = 12.5;

fn main() {
    let matches = Command::new("forksim")
        .version("0.1.0")
        .about("フォークリフト接近警報シミュレーション (Forklift Alert Simulation)")
        .long_about("2台のフォークリフトの相対配置から整列・接近警報を評価し、\n\
                     距離計測ノイズによる角度推定誤差を集計するオフライン解析ツールです。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .requires("scenario")
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .requires("scenario")
                .help("実行結果の統計をYAMLで書き出す")
        )
        .arg(
            Arg::new("generate")
                .short('g')
                .long("generate")
                .value_name("FILE")
                .conflicts_with_all(["scenario", "test"])
                .help("ランダム2台配置の線分ログを生成")
        )
        .arg(
            Arg::new("count")
                .long("count")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .default_value("10000")
                .help("生成する配置数 (--generate と併用)")
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64))
                .help("生成用の乱数シード (--generate と併用)")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("scenario")
                .help("基準配置で警報判定を評価して表示")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .value_parser(clap::value_parser!(LogOutput))
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let log_config = LogConfig {
        level: matches
            .get_one::<String>("log-level")
            .map(|level| parse_log_level(level))
            .unwrap_or_else(|| LogConfig::level_for_verbosity(verbose_level)),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        ..LogConfig::default()
    };
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("フォークリフト接近警報シミュレーション - forksim v0.1.0");
    println!();

    let result = if matches.get_flag("test") {
        run_reference_evaluation();
        Ok(())
    } else if let Some(path) = matches.get_one::<String>("generate") {
        generate_segments(path, &matches)
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        run_scenario(
            scenario_path,
            matches.get_flag("info"),
            matches.get_one::<String>("output").map(String::as_str),
            verbose_level,
        )
    } else {
        show_default_help();
        Ok(())
    };

    if let Err(e) = result {
        error!("実行失敗: {}", e);
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    output_path: Option<&str>,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;
    info!("シナリオファイル読み込み完了: {}", scenario_path);

    scenario.print_summary();
    if info_only {
        return Ok(());
    }
    println!();

    let mut engine = SimulationEngine::new(scenario, verbose_level)?;
    engine.initialize()?;
    let stats = engine.run()?;
    stats.print_report();

    if let Some(path) = output_path {
        let yaml = serde_yaml::to_string(&stats)?;
        std::fs::write(path, yaml)?;
        println!();
        println!("統計を書き出しました: {}", path);
    }

    Ok(())
}

/// ランダム2台配置の線分ログを書き出す
fn generate_segments(path: &str, matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let count = matches.get_one::<u64>("count").copied().unwrap_or(10_000);
    let seed = matches
        .get_one::<u64>("seed")
        .copied()
        .unwrap_or_else(rand::random::<u64>);

    let source = RandomPairSource::seeded(count, GENERATE_HALF_LENGTH, GENERATE_MAX_DISTANCE, seed);
    println!("{}", source.describe());
    println!("シード値: {}", seed);

    let written = write_segment_log(path, source)?;
    println!("{}配置を書き出しました: {}", written, path);
    Ok(())
}

/// 基準配置の警報判定結果を表示
fn run_reference_evaluation() {
    println!("=== 基準配置の警報判定 ===");

    let evaluator = AlertEvaluator::default();
    let references = [
        (
            "交差配置（C-D が A-B を横切る）",
            Configuration::from_points(
                Point2D::new(0.0, 0.0),
                Point2D::new(3.0, 0.0),
                Point2D::new(1.5, 5.0),
                Point2D::new(1.5, -5.0),
            ),
        ),
        (
            "平行・離隔配置",
            Configuration::from_points(
                Point2D::new(0.0, 0.0),
                Point2D::new(3.0, 0.0),
                Point2D::new(10.0, 0.5),
                Point2D::new(13.0, 0.5),
            ),
        ),
        (
            "平行・近接配置",
            Configuration::from_points(
                Point2D::new(0.0, 0.0),
                Point2D::new(3.0, 0.0),
                Point2D::new(0.0, 0.5),
                Point2D::new(3.0, 0.5),
            ),
        ),
    ];

    for (label, config) in &references {
        let evaluation = evaluator.evaluate(config);
        println!();
        println!("--- {} ---", label);
        println!("  配置: {}", config);
        println!(
            "  正接: ta={:.4}, tb={:.4}, tc={:.4}, td={:.4}",
            evaluation.tangents.ta, evaluation.tangents.tb, evaluation.tangents.tc, evaluation.tangents.td
        );
        println!("  m = {:.6e}, n = {:.6e}", evaluation.m, evaluation.n);
        for (name, distance) in evaluation.distances.labeled() {
            println!("  {} = {:.3}m", name, distance);
        }
        println!(
            "  警報: {} (角度: {}, 距離: {})",
            if evaluation.alert { "発報" } else { "なし" },
            evaluation.angle_alert,
            evaluation.distance_alert
        );
    }
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  forksim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>  シナリオファイルを指定して実行");
    println!("  -i, --info             シナリオ情報のみ表示");
    println!("  -o, --output <FILE>    統計をYAMLで書き出す");
    println!("  -g, --generate <FILE>  ランダム配置の線分ログを生成 (--count, --seed)");
    println!("  -t, --test             基準配置の警報判定を表示");
    println!("  -v, --verbose          詳細出力 (複数指定で詳細レベル上昇)");
    println!("  -h, --help             このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/replay.yaml        - 線分ログの再生（6距離推定）");
    println!("  scenarios/monte_carlo.yaml   - モンテカルロ配置（4距離推定）");
    println!("  scenarios/sweep.yaml         - 系統的スイープ（ACBのみ）");
    println!("  scenarios/random_pairs.yaml  - ランダム2台配置");
    println!();
    println!("例:");
    println!("  forksim -s scenarios/replay.yaml");
    println!("  forksim -s scenarios/monte_carlo.yaml -v -o results.yaml");
    println!("  forksim -s scenarios/sweep.yaml -i");
    println!("  forksim -g data/segments.txt --count 10000 --seed 42");
    println!("  forksim --test");
}
