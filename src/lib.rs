//! 記事ごとの翻訳状況の管理
//!
//! - `domain`: ステータスモデル・一覧の絞り込み・レコードストア
//! - `app`: ステータス編集ワークフロー
//! - `infra`: 設定・DB接続・ファイル読み込み
//! - `types`: エラー型

pub mod app;
pub mod domain;
pub mod infra;
pub mod types;
