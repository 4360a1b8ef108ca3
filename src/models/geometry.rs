//! # Geometry モジュール
//!
//! 平面上の点に対する幾何プリミティブ（距離・3点角度）を提供します。
//! 警報判定とノイズ付き角度推定の両方がここを共有します。

use crate::models::common::{Point2D, math_utils};

/// 2点間のユークリッド距離
///
/// `hypot` を用いるため、座標の絶対値が極端に大きい/小さい場合でも
/// 二乗和のオーバーフロー・アンダーフローを起こしません。
pub fn distance(p: &Point2D, q: &Point2D) -> f64 {
    (p.x - q.x).hypot(p.y - q.y)
}

/// 頂点 `p2` において `p1` 方向と `p3` 方向のなす符号付き角度
///
/// 2つの脚ベクトルの外積と内積から `atan2(cross, dot)` を求め、
/// 負の値には 2π を加えて [0, 2π) に写像します。
///
/// # 退化ケース
///
/// `p1 == p2` または `p3 == p2`（脚の長さが0）の場合、角度は幾何学的に未定義です。
/// このとき `atan2(0, 0)` と同じく 0 を返します。符号付きゼロの組み合わせで
/// π が得られることはありません。戻り値 0 は意味のある角度の読みではない点に注意してください。
pub fn angle(p1: &Point2D, p2: &Point2D, p3: &Point2D) -> f64 {
    let v1 = *p1 - *p2;
    let v2 = *p3 - *p2;

    if v1.is_zero() || v2.is_zero() {
        return 0.0;
    }

    let dot = v1.x * v2.x + v1.y * v2.y;
    let cross = v1.x * v2.y - v1.y * v2.x;

    math_utils::wrap_to_positive(cross.atan2(dot))
}
