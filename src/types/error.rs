use crate::domain::status::ArticleId;
use crate::types::InfraError;
use thiserror::Error;

/// フォーム入力の検証エラー
/// どのフィールドが拒否されたかを保持し、フィールド単位で利用者に返す
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("入力値が不正です: {field} - {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    /// 検証エラーを作成
    pub fn new<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 翻訳名候補の重複エラー
/// 既に同じ候補名を持つ記事の識別子を保持する
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("翻訳名候補「{suggested_name}」は記事 {conflicting_article_id} で既に使われています")]
pub struct DuplicateSuggestionError {
    pub conflicting_article_id: ArticleId,
    pub suggested_name: String,
}

/// ステータスレコード保存時のエラー
#[derive(Error, Debug)]
pub enum SaveError {
    #[error(transparent)]
    DuplicateSuggestion(#[from] DuplicateSuggestionError),

    #[error(transparent)]
    Persistence(#[from] InfraError),
}

/// ステータス編集ワークフローのエラー
/// いずれの場合もレコードは変更されない
#[derive(Error, Debug)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DuplicateSuggestion(#[from] DuplicateSuggestionError),

    #[error(transparent)]
    Persistence(#[from] InfraError),
}

impl From<SaveError> for EditError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::DuplicateSuggestion(dup) => Self::DuplicateSuggestion(dup),
            SaveError::Persistence(infra) => Self::Persistence(infra),
        }
    }
}

/// 保存エラーのResult型エイリアス
pub type SaveResult<T> = std::result::Result<T, SaveError>;

/// 編集エラーのResult型エイリアス
pub type EditResult<T> = std::result::Result<T, EditError>;
