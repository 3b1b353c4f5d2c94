use crate::domain::status::{ArticleId, StatusRecordStore, TranslationStatus, TranslationStatusRecord};
use crate::types::{EditResult, ValidationError};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

/// 編集フォームの生の入力（フィールド名 → 入力文字列）
pub type RawEditFields = HashMap<String, String>;

/// 日付フィールドの入力形式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const FIELD_COMMENTS: &str = "comments";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_TRANSLATOR: &str = "translator";
pub const FIELD_PROJECT: &str = "project";
pub const FIELD_SUGGESTED_NAME: &str = "suggested_name";
pub const FIELD_WORD_COUNT: &str = "wordcount";
pub const FIELD_START_DATE: &str = "start_date";
pub const FIELD_END_DATE: &str = "end_date";

const KNOWN_FIELDS: [&str; 8] = [
    FIELD_COMMENTS,
    FIELD_STATUS,
    FIELD_TRANSLATOR,
    FIELD_PROJECT,
    FIELD_SUGGESTED_NAME,
    FIELD_WORD_COUNT,
    FIELD_START_DATE,
    FIELD_END_DATE,
];

/// 検証済みの編集内容
///
/// 編集可能な項目は全て上書きする。未入力の項目は未設定として保存される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEdit {
    pub status: TranslationStatus,
    pub suggested_name: Option<String>,
    pub translator: Option<String>,
    pub project: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub word_count: Option<i32>,
    pub comments: Option<String>,
}

impl StatusEdit {
    /// フォーム入力を正規化・検証する
    pub fn from_fields(fields: &RawEditFields) -> Result<Self, ValidationError> {
        for key in fields.keys() {
            if !KNOWN_FIELDS.contains(&key.as_str()) {
                debug!(field = %key, "不明なフィールドを無視");
            }
        }

        let field = |name: &str| normalize(fields.get(name));

        let status = match field(FIELD_STATUS) {
            Some(code) => TranslationStatus::from_code(&code).ok_or_else(|| {
                ValidationError::new(FIELD_STATUS, format!("不明なステータスです: {}", code))
            })?,
            None => TranslationStatus::Untranslated,
        };

        Ok(Self {
            status,
            suggested_name: field(FIELD_SUGGESTED_NAME),
            translator: field(FIELD_TRANSLATOR),
            project: field(FIELD_PROJECT),
            start_date: parse_date(FIELD_START_DATE, field(FIELD_START_DATE))?,
            end_date: parse_date(FIELD_END_DATE, field(FIELD_END_DATE))?,
            word_count: parse_word_count(field(FIELD_WORD_COUNT))?,
            comments: field(FIELD_COMMENTS),
        })
    }

    /// レコードの編集可能な項目を上書きする
    ///
    /// 外部翻訳リンクの有無に関わらず、入力されたステータスをそのまま設定する。
    pub fn apply_to(&self, record: &mut TranslationStatusRecord) {
        record.status = self.status;
        record.suggested_name = self.suggested_name.clone();
        record.translator = self.translator.clone();
        record.project = self.project.clone();
        record.start_date = self.start_date;
        record.end_date = self.end_date;
        record.word_count = self.word_count;
        record.comments = self.comments.clone();
    }
}

/// 前後の空白を除き、空文字は未設定にする
fn normalize(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_word_count(raw: Option<String>) -> Result<Option<i32>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.starts_with('-') {
        return Err(ValidationError::new(
            FIELD_WORD_COUNT,
            format!("0以上の整数を指定してください: {}", raw),
        ));
    }
    // 符号付きの表記（+5など）は受け付けない
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            FIELD_WORD_COUNT,
            format!("整数ではありません: {}", raw),
        ));
    }
    let value: i64 = raw.parse().map_err(|_| {
        ValidationError::new(FIELD_WORD_COUNT, format!("値が大きすぎます: {}", raw))
    })?;
    let value = i32::try_from(value).map_err(|_| {
        ValidationError::new(FIELD_WORD_COUNT, format!("値が大きすぎます: {}", raw))
    })?;
    Ok(Some(value))
}

fn parse_date(field: &str, raw: Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let invalid = || {
        ValidationError::new(
            field,
            format!("日付はYYYY-MM-DD形式で指定してください: {}", raw),
        )
    };
    if !has_date_shape(&raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| invalid())
}

// 桁数固定のYYYY-MM-DDか（chronoは桁数の少ない月日や符号付きの年も受け付ける）
fn has_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// 1件のステータスレコードに編集を適用して保存する
///
/// 1. 入力の正規化と検証（失敗時は何も読み書きしない）
/// 2. 既存レコードの読み込み（無ければ未翻訳の新規レコード）
/// 3. 編集可能な項目の上書き
/// 4. 保存（翻訳名候補が他の記事と重複すれば `EditError::DuplicateSuggestion`）
pub async fn apply_edit<S: StatusRecordStore + ?Sized>(
    store: &S,
    article_id: ArticleId,
    fields: &RawEditFields,
) -> EditResult<TranslationStatusRecord> {
    let edit = StatusEdit::from_fields(fields)?;

    let mut record = match store.get(article_id).await? {
        Some(existing) => existing,
        None => {
            debug!(article_id, "ステータスレコードが無いため新規作成");
            TranslationStatusRecord::new(article_id)
        }
    };
    edit.apply_to(&mut record);

    store.save(&record).await?;
    info!(article_id, status = %record.status, "ステータスを更新");
    Ok(record)
}
