use crate::types::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 記事の識別子（page.page_id）
pub type ArticleId = i64;

// 記事の翻訳状態を表現するenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// 未翻訳（レコードが存在しない記事もこの扱い）
    Untranslated,
    /// 翻訳作業中
    #[serde(rename = "progress", alias = "in_progress")]
    InProgress,
    /// レビュー待ち
    Review,
    /// 翻訳済み
    Translated,
    /// 翻訳対象外
    Irrelevant,
}

impl TranslationStatus {
    pub const ALL: [TranslationStatus; 5] = [
        Self::Untranslated,
        Self::InProgress,
        Self::Review,
        Self::Translated,
        Self::Irrelevant,
    ];

    /// 保存・表示に使うステータスコード
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Untranslated => "untranslated",
            Self::InProgress => "progress",
            Self::Review => "review",
            Self::Translated => "translated",
            Self::Irrelevant => "irrelevant",
        }
    }

    /// ステータスコードから変換する（`in_progress` も受け付ける）
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "untranslated" => Some(Self::Untranslated),
            "progress" | "in_progress" => Some(Self::InProgress),
            "review" => Some(Self::Review),
            "translated" => Some(Self::Translated),
            "irrelevant" => Some(Self::Irrelevant),
            _ => None,
        }
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for TranslationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| {
            ValidationError::new("status", format!("不明なステータスです: {}", s))
        })
    }
}

// 記事メタデータ（外部のページストアから読み取るだけ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub article_id: ArticleId,
    pub namespace: i32,
    /// DBキー形式のタイトル（空白はアンダースコア）
    pub title: String,
    pub is_redirect: bool,
    /// ページプロパティから取得した記事種別
    pub article_type: Option<String>,
}

// 記事ごとの翻訳ステータスレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStatusRecord {
    pub article_id: ArticleId,
    pub status: TranslationStatus,
    pub suggested_name: Option<String>,
    pub translator: Option<String>,
    pub project: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub word_count: Option<i32>,
    pub comments: Option<String>,
    /// 外部集計値。編集ワークフローからは書き込まない
    pub page_views: i64,
    /// 外部で付与される主カテゴリ。編集ワークフローからは書き込まない
    pub main_category: Option<String>,
}

impl TranslationStatusRecord {
    /// レコードが存在しない記事の既定値（未翻訳・全項目空）
    pub fn new(article_id: ArticleId) -> Self {
        Self {
            article_id,
            status: TranslationStatus::Untranslated,
            suggested_name: None,
            translator: None,
            project: None,
            start_date: None,
            end_date: None,
            word_count: None,
            comments: None,
            page_views: 0,
            main_category: None,
        }
    }

    /// 空でない翻訳名候補を返す
    pub fn suggestion(&self) -> Option<&str> {
        self.suggested_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

/// 表示用の実効ステータスを求める
///
/// 外部翻訳リンクが存在する場合は保存値に関わらず `Translated` になる。
/// レコードが無い記事は `Untranslated` として扱う。
pub fn derive_effective_status(
    record: Option<&TranslationStatusRecord>,
    has_external_link: bool,
) -> TranslationStatus {
    if has_external_link {
        return TranslationStatus::Translated;
    }
    record
        .map(|r| r.status)
        .unwrap_or(TranslationStatus::Untranslated)
}

/// 編集画面でステータス欄を編集可能として表示するか
///
/// 実効ステータスが翻訳済みになった記事は編集不可として表示する。
/// ワークフロー自体はこの判定で保存を拒否しない。
pub fn is_status_editable(
    record: Option<&TranslationStatusRecord>,
    has_external_link: bool,
) -> bool {
    derive_effective_status(record, has_external_link) != TranslationStatus::Translated
}
