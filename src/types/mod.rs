//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - インフラエラー: データベース・ファイル操作の失敗
//! - 設定エラー: 環境変数・設定ファイルの不備
//! - ドメインエラー: 入力検証、翻訳名候補の重複、保存の失敗

pub mod config;
pub mod error;
pub mod infra;

// 便利な再エクスポート
pub use config::{ConfigError, ConfigResult};
pub use error::{
    DuplicateSuggestionError, EditError, EditResult, SaveError, SaveResult, ValidationError,
};
pub use infra::{InfraError, InfraResult};
