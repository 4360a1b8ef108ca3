use std::fmt;
use std::ops::{Add, Sub, Mul};
use serde::{Deserialize, Serialize};

/// 2次元位置を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64, // m
    pub y: f64, // m
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 原点
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 中心点から指定方向（ラジアン）に距離だけ離れた点
    pub fn from_polar(center: Point2D, radius: f64, angle_rad: f64) -> Self {
        Self::new(
            center.x + radius * angle_rad.cos(),
            center.y + radius * angle_rad.sin(),
        )
    }

    /// 2点の中点
    pub fn midpoint(&self, other: &Point2D) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// ベクトルとしての長さ
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// 長さ0のベクトルかどうか
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// 両座標が有限値かどうか
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// 2点剛体（フォークリフト）
///
/// 端点の組のみで表され、向きの状態は持ちません。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// 第1端点（A または C）
    pub start: Point2D,
    /// 第2端点（B または D）
    pub end: Point2D,
}

impl Body {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    /// 中心・半長・向きから端点を生成
    ///
    /// start = 中心 + 半長·(cos, sin)、end = 中心 − 半長·(cos, sin)
    pub fn from_center(center: Point2D, half_length: f64, heading_rad: f64) -> Self {
        Self::new(
            Point2D::from_polar(center, half_length, heading_rad),
            Point2D::from_polar(center, -half_length, heading_rad),
        )
    }

    /// 端点間の長さ
    pub fn length(&self) -> f64 {
        (self.end - self.start).magnitude()
    }

    /// 中心位置
    pub fn center(&self) -> Point2D {
        self.start.midpoint(&self.end)
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }
}

/// 1ステップで観測された2台の配置
///
/// body1 = (A, B)、body2 = (C, D)。ステップ毎に生成され、生成後は変更されません。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub body1: Body,
    pub body2: Body,
}

impl Configuration {
    pub fn new(body1: Body, body2: Body) -> Self {
        Self { body1, body2 }
    }

    /// 4点から配置を作成
    pub fn from_points(a: Point2D, b: Point2D, c: Point2D, d: Point2D) -> Self {
        Self::new(Body::new(a, b), Body::new(c, d))
    }

    pub fn a(&self) -> Point2D {
        self.body1.start
    }

    pub fn b(&self) -> Point2D {
        self.body1.end
    }

    pub fn c(&self) -> Point2D {
        self.body2.start
    }

    pub fn d(&self) -> Point2D {
        self.body2.end
    }

    pub fn is_finite(&self) -> bool {
        self.body1.is_finite() && self.body2.is_finite()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={} B={} C={} D={}",
            self.a(),
            self.b(),
            self.c(),
            self.d()
        )
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    use std::f64::consts::{PI, TAU};

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / PI
    }

    /// 角度を [0, 2π) の範囲に正規化
    ///
    /// 負の微小値に 2π を加えると丸めで 2π ちょうどになるため、その場合は 0 を返します。
    pub fn wrap_to_positive(angle_rad: f64) -> f64 {
        let wrapped = angle_rad.rem_euclid(TAU);
        if wrapped >= TAU { 0.0 } else { wrapped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_point_ops() {
        let p = Point2D::new(1.0, 2.0);
        let q = Point2D::new(4.0, 6.0);
        assert_eq!(q - p, Point2D::new(3.0, 4.0));
        assert_eq!(p + q, Point2D::new(5.0, 8.0));
        assert_eq!((q - p) * 2.0, Point2D::new(6.0, 8.0));
        assert!(((q - p).magnitude() - 5.0).abs() < 1e-12);
        assert_eq!(p.midpoint(&q), Point2D::new(2.5, 4.0));
    }

    #[test]
    fn test_body_from_center() {
        let body = Body::from_center(Point2D::new(10.0, 0.0), 1.5, 0.0);
        assert_eq!(body.start, Point2D::new(11.5, 0.0));
        assert_eq!(body.end, Point2D::new(8.5, 0.0));
        assert!((body.length() - 3.0).abs() < 1e-12);
        assert_eq!(body.center(), Point2D::new(10.0, 0.0));
    }

    #[test]
    fn test_configuration_accessors() {
        let config = Configuration::from_points(
            Point2D::new(0.0, 0.0),
            Point2D::new(3.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        );
        assert_eq!(config.a(), Point2D::new(0.0, 0.0));
        assert_eq!(config.b(), Point2D::new(3.0, 0.0));
        assert_eq!(config.c(), Point2D::new(1.0, 1.0));
        assert_eq!(config.d(), Point2D::new(2.0, 2.0));
        assert!(config.is_finite());

        let broken = Configuration::from_points(
            Point2D::new(f64::NAN, 0.0),
            Point2D::new(3.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        );
        assert!(!broken.is_finite());
    }

    #[test]
    fn test_wrap_to_positive() {
        assert_eq!(math_utils::wrap_to_positive(0.0), 0.0);
        assert!((math_utils::wrap_to_positive(-PI / 2.0) - 1.5 * PI).abs() < 1e-12);
        assert!((math_utils::wrap_to_positive(PI) - PI).abs() < 1e-12);
        assert_eq!(math_utils::wrap_to_positive(-1e-18), 0.0);
        assert!(math_utils::wrap_to_positive(TAU) < TAU);
    }

    #[test]
    fn test_degree_conversion() {
        assert!((math_utils::deg_to_rad(180.0) - PI).abs() < 1e-12);
        assert!((math_utils::rad_to_deg(PI / 2.0) - 90.0).abs() < 1e-12);
    }
}
