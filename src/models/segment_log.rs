use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{
    common::{Body, Configuration, Point2D},
    traits::IConfigurationSource,
};

/// 線分ログの1行 `Segment[(x1, y1), (x2, y2)]` を解析
///
/// 形式が異なる行、数値に変換できない行、非有限値を含む行はNoneを返します。
pub fn parse_segment_line(line: &str) -> Option<Body> {
    let line = line.trim();
    let inner = line.strip_prefix("Segment[")?.strip_suffix(']')?;

    let mut parts = inner.split("), (");
    let first = parts.next()?;
    let second = parts.next()?;

    let start = parse_point(first)?;
    let end = parse_point(second)?;

    if !start.is_finite() || !end.is_finite() {
        return None;
    }

    Some(Body::new(start, end))
}

fn parse_point(text: &str) -> Option<Point2D> {
    let cleaned: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
    let mut coords = cleaned.split(',');
    let x = coords.next()?.trim().parse::<f64>().ok()?;
    let y = coords.next()?.trim().parse::<f64>().ok()?;
    if coords.next().is_some() {
        return None;
    }
    Some(Point2D::new(x, y))
}

/// 線分を1行の文字列に整形（小数点以下2桁）
pub fn format_segment(body: &Body) -> String {
    format!(
        "Segment[({:.2}, {:.2}), ({:.2}, {:.2})]",
        body.start.x, body.start.y, body.end.x, body.end.y
    )
}

/// 配置列を線分ログ形式でファイルに書き出す
///
/// 1配置につき body1、body2 の順に2行を出力します。
pub fn write_segment_log<P, I>(path: P, configurations: I) -> Result<usize, SourceError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Configuration>,
{
    let path = path.as_ref();
    let file = fs::File::create(path).map_err(|e| SourceError::IoError(path.to_path_buf(), e))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut written = 0;
    for config in configurations {
        writeln!(writer, "{}", format_segment(&config.body1))
            .and_then(|_| writeln!(writer, "{}", format_segment(&config.body2)))
            .map_err(|e| SourceError::IoError(path.to_path_buf(), e))?;
        written += 1;
    }
    writer.flush().map_err(|e| SourceError::IoError(path.to_path_buf(), e))?;

    Ok(written)
}

/// 線分ログの再生
///
/// 連続する2線分を1配置（1台目 = A-B、2台目 = C-D）として順に供給します。
///
/// 奇数本のログでは末尾の線分を破棄します。末尾の1本を警報なしの1ステップとして
/// 数える集計とはステップ数が1つずれ、警報率もその分だけ異なります。
/// 破棄したかどうかは `dropped_trailing_segment` で確認できます。
#[derive(Debug, Clone)]
pub struct SegmentLog {
    pub origin: String,
    configurations: Vec<Configuration>,
    position: usize,
    /// 解析できずに読み飛ばした行数
    pub skipped_lines: usize,
    /// 相手のいない末尾の線分があったか
    pub dropped_trailing_segment: bool,
}

impl SegmentLog {
    /// ファイルから読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SourceError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SourceError::IoError(path.to_path_buf(), e))?;

        let log = Self::parse(&path.display().to_string(), &contents);
        if log.configurations.is_empty() {
            return Err(SourceError::NoSegments(path.to_path_buf()));
        }

        Ok(log)
    }

    /// テキストから解析
    pub fn parse(origin: &str, contents: &str) -> Self {
        let mut segments = Vec::new();
        let mut skipped_lines = 0;

        for line in contents.lines() {
            match parse_segment_line(line) {
                Some(body) => segments.push(body),
                None => {
                    if !line.trim().is_empty() {
                        skipped_lines += 1;
                    }
                }
            }
        }

        let dropped_trailing_segment = segments.len() % 2 == 1;
        if dropped_trailing_segment {
            warn!("{}: 末尾の線分に対になる線分がないため破棄します", origin);
        }
        if skipped_lines > 0 {
            debug!("{}: 解析できない行を{}行読み飛ばしました", origin, skipped_lines);
        }

        let configurations = segments
            .chunks_exact(2)
            .map(|pair| Configuration::new(pair[0], pair[1]))
            .collect();

        Self {
            origin: origin.to_string(),
            configurations,
            position: 0,
            skipped_lines,
            dropped_trailing_segment,
        }
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

impl Iterator for SegmentLog {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        let config = self.configurations.get(self.position).copied()?;
        self.position += 1;
        Some(config)
    }
}

impl IConfigurationSource for SegmentLog {
    fn describe(&self) -> String {
        format!("線分ログ再生: {} ({}配置)", self.origin, self.configurations.len())
    }

    fn expected_steps(&self) -> Option<u64> {
        Some(self.configurations.len() as u64)
    }
}

/// 線分ログの入出力エラー
#[derive(Debug)]
pub enum SourceError {
    FileNotFound(PathBuf),
    IoError(PathBuf, std::io::Error),
    NoSegments(PathBuf),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::FileNotFound(path) => {
                write!(f, "線分ログが見つかりません: {}", path.display())
            }
            SourceError::IoError(path, err) => {
                write!(f, "線分ログの入出力エラー {}: {}", path.display(), err)
            }
            SourceError::NoSegments(path) => {
                write!(f, "線分ログに有効な配置がありません: {}", path.display())
            }
        }
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_line() {
        let body = parse_segment_line("Segment[(1.25, -3.50), (4.00, 0.75)]").unwrap();
        assert_eq!(body.start, Point2D::new(1.25, -3.5));
        assert_eq!(body.end, Point2D::new(4.0, 0.75));

        let padded = parse_segment_line("   Segment[(0, 0), (3, 0)]  ").unwrap();
        assert_eq!(padded.end, Point2D::new(3.0, 0.0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_segment_line("Polygon[(1, 2), (3, 4)]").is_none());
        assert!(parse_segment_line("Segment[(1, 2), (3, 4)").is_none());
        assert!(parse_segment_line("Segment[(1, 2)]").is_none());
        assert!(parse_segment_line("Segment[(a, 2), (3, 4)]").is_none());
        assert!(parse_segment_line("Segment[(1, 2, 5), (3, 4)]").is_none());
        assert!(parse_segment_line("Segment[(NaN, 2), (3, 4)]").is_none());
        assert!(parse_segment_line("Segment[(inf, 2), (3, 4)]").is_none());
    }

    #[test]
    fn test_pairs_segments_into_configurations() {
        let text = "\
Segment[(0.00, 0.00), (3.00, 0.00)]
garbage line
Segment[(1.50, 5.00), (1.50, -5.00)]

Segment[(1.00, 1.00), (2.00, 2.00)]
Segment[(5.00, 5.00), (6.00, 6.00)]
Segment[(9.00, 9.00), (9.50, 9.50)]
";
        let log = SegmentLog::parse("test", text);
        assert_eq!(log.len(), 2);
        assert_eq!(log.skipped_lines, 1);
        assert!(log.dropped_trailing_segment);
        assert_eq!(log.expected_steps(), Some(2));

        let configs: Vec<Configuration> = log.collect();
        assert_eq!(configs[0].c(), Point2D::new(1.5, 5.0));
        assert_eq!(configs[0].d(), Point2D::new(1.5, -5.0));
        assert_eq!(configs[1].a(), Point2D::new(1.0, 1.0));
    }

    #[test]
    fn test_format_segment() {
        let body = Body::new(Point2D::new(1.0, -2.346), Point2D::new(0.004, 10.0));
        assert_eq!(format_segment(&body), "Segment[(1.00, -2.35), (0.00, 10.00)]");
        assert!(parse_segment_line(&format_segment(&body)).is_some());
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.txt");

        let configs = vec![
            Configuration::from_points(
                Point2D::new(0.0, 0.0),
                Point2D::new(3.0, 0.0),
                Point2D::new(1.504, 4.996),
                Point2D::new(-1.5, -5.25),
            ),
            Configuration::from_points(
                Point2D::new(-7.126, 2.0),
                Point2D::new(-4.1, 2.333),
                Point2D::new(10.0, 0.5),
                Point2D::new(13.0, 0.5),
            ),
        ];

        let written = write_segment_log(&path, configs.clone()).unwrap();
        assert_eq!(written, 2);

        let log = SegmentLog::from_file(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.skipped_lines, 0);
        assert!(!log.dropped_trailing_segment);

        let read: Vec<Configuration> = log.collect();
        for (original, restored) in configs.iter().zip(&read) {
            let expected = [original.a(), original.b(), original.c(), original.d()];
            let actual = [restored.a(), restored.b(), restored.c(), restored.d()];
            for (e, a) in expected.iter().zip(actual.iter()) {
                assert!((e.x - a.x).abs() <= 0.005 + 1e-9);
                assert!((e.y - a.y).abs() <= 0.005 + 1e-9);
            }
        }
        assert_eq!(read[0].c(), Point2D::new(1.5, 5.0));
        assert_eq!(read[1].a(), Point2D::new(-7.13, 2.0));
    }

    #[test]
    fn test_odd_log_drops_last_segment() {
        let text = "\
Segment[(0.00, 0.00), (3.00, 0.00)]
Segment[(1.50, 5.00), (1.50, -5.00)]
Segment[(9.00, 9.00), (9.50, 9.50)]
";
        let log = SegmentLog::parse("odd", text);
        assert_eq!(log.len(), 1);
        assert!(log.dropped_trailing_segment);
    }

    #[test]
    fn test_missing_file() {
        let err = SegmentLog::from_file("does/not/exist.txt").unwrap_err();
        assert!(matches!(err, SourceError::FileNotFound(_)));
    }
}
