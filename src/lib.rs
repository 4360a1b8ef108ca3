//! # forksim
//!
//! 2台のフォークリフト（2点剛体 A-B、C-D）の相対配置から接近・整列警報を評価し、
//! 距離計測ノイズによる角度推定誤差を集計するオフライン解析ライブラリです。

pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
