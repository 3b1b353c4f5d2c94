use super::model::{ArticleId, TranslationStatus, TranslationStatusRecord};
use crate::types::{DuplicateSuggestionError, InfraError, InfraResult, SaveError, SaveResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// ステータスレコード永続化の抽象化トレイト
///
/// 保存時の翻訳名候補の一意性チェックと書き込みは、実装側で
/// 1つのトランザクション相当として原子的に行う。
#[async_trait]
pub trait StatusRecordStore: Send + Sync {
    /// 記事のステータスレコードを取得する（無ければNone）
    async fn get(&self, article_id: ArticleId) -> InfraResult<Option<TranslationStatusRecord>>;

    /// ステータスレコードを保存する
    ///
    /// 他の記事が同じ翻訳名候補を持っている場合は
    /// `SaveError::DuplicateSuggestion` を返し、何も書き込まない。
    async fn save(&self, record: &TranslationStatusRecord) -> SaveResult<()>;

    /// 記事のステータスレコードが存在するか
    async fn exists(&self, article_id: ArticleId) -> InfraResult<bool>;
}

// translation_statusテーブルの行（テーブル定義と一致）
#[derive(Debug, FromRow)]
struct StatusRow {
    page_id: ArticleId,
    status: String,
    suggested_name: Option<String>,
    translator: Option<String>,
    project: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    word_count: Option<i32>,
    comments: Option<String>,
    page_views: i64,
    main_category: Option<String>,
}

impl TryFrom<StatusRow> for TranslationStatusRecord {
    type Error = InfraError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        let status = TranslationStatus::from_code(&row.status)
            .ok_or_else(|| InfraError::corrupt_value("translation_status.status", row.status))?;
        Ok(Self {
            article_id: row.page_id,
            status,
            suggested_name: row.suggested_name,
            translator: row.translator,
            project: row.project,
            start_date: row.start_date,
            end_date: row.end_date,
            word_count: row.word_count,
            comments: row.comments,
            page_views: row.page_views,
            main_category: row.main_category,
        })
    }
}

/// PostgreSQLを使用した本番用のストア実装
#[derive(Clone)]
pub struct PgStatusRecordStore {
    pool: PgPool,
}

impl PgStatusRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 同じ翻訳名候補を持つ他の記事を探す
    ///
    /// トランザクション内では該当行をロックし、コミットまで他の更新を待たせる。
    async fn find_conflict(
        conn: &mut PgConnection,
        record: &TranslationStatusRecord,
        lock: bool,
    ) -> InfraResult<Option<DuplicateSuggestionError>> {
        let Some(name) = record.suggestion() else {
            return Ok(None);
        };

        let sql = if lock {
            "SELECT page_id FROM translation_status WHERE suggested_name = $1 AND page_id <> $2 ORDER BY page_id LIMIT 1 FOR UPDATE"
        } else {
            "SELECT page_id FROM translation_status WHERE suggested_name = $1 AND page_id <> $2 ORDER BY page_id LIMIT 1"
        };
        let conflicting: Option<(ArticleId,)> = sqlx::query_as(sql)
            .bind(name)
            .bind(record.article_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| InfraError::database_query("翻訳名候補の重複確認", e))?;

        Ok(conflicting.map(|(conflicting_article_id,)| DuplicateSuggestionError {
            conflicting_article_id,
            suggested_name: name.to_string(),
        }))
    }

    /// 一意制約違反を重複エラーに変換する（同時更新で事前チェックをすり抜けた場合）
    async fn resolve_unique_violation(
        &self,
        record: &TranslationStatusRecord,
        source: sqlx::Error,
    ) -> SaveError {
        let is_suggestion_violation = matches!(
            &source,
            sqlx::Error::Database(db) if db.is_unique_violation()
                && db.constraint() == Some("translation_status_suggested_name_key")
        );
        if !is_suggestion_violation {
            return InfraError::database_query("ステータスレコードの保存", source).into();
        }

        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return InfraError::database_connection(e).into(),
        };
        match Self::find_conflict(&mut conn, record, false).await {
            Ok(Some(duplicate)) => duplicate.into(),
            Ok(None) => InfraError::database_query("ステータスレコードの保存", source).into(),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl StatusRecordStore for PgStatusRecordStore {
    async fn get(&self, article_id: ArticleId) -> InfraResult<Option<TranslationStatusRecord>> {
        let row: Option<StatusRow> = sqlx::query_as(
            r#"
            SELECT page_id, status, suggested_name, translator, project,
                   start_date, end_date, word_count, comments, page_views, main_category
            FROM translation_status
            WHERE page_id = $1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| InfraError::database_query("ステータスレコードの取得", e))?;

        row.map(TranslationStatusRecord::try_from).transpose()
    }

    async fn save(&self, record: &TranslationStatusRecord) -> SaveResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(InfraError::database_connection)?;

        if let Some(duplicate) = Self::find_conflict(&mut tx, record, true).await? {
            debug!(
                article_id = record.article_id,
                conflicting_article_id = duplicate.conflicting_article_id,
                "翻訳名候補が重複しているため保存を中止"
            );
            // txはコミットせずに破棄されロールバックされる
            return Err(duplicate.into());
        }

        // 外部で管理される page_views と main_category は更新しない
        let result = sqlx::query(
            r#"
            INSERT INTO translation_status (
                page_id, status, suggested_name, translator, project,
                start_date, end_date, word_count, comments
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (page_id) DO UPDATE SET
                status = EXCLUDED.status,
                suggested_name = EXCLUDED.suggested_name,
                translator = EXCLUDED.translator,
                project = EXCLUDED.project,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                word_count = EXCLUDED.word_count,
                comments = EXCLUDED.comments
            "#,
        )
        .bind(record.article_id)
        .bind(record.status.as_code())
        .bind(record.suggestion())
        .bind(record.translator.as_deref())
        .bind(record.project.as_deref())
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.word_count)
        .bind(record.comments.as_deref())
        .execute(&mut *tx)
        .await;

        if let Err(e) = result {
            drop(tx);
            return Err(self.resolve_unique_violation(record, e).await);
        }

        if let Err(e) = tx.commit().await {
            return Err(self.resolve_unique_violation(record, e).await);
        }

        info!(
            article_id = record.article_id,
            status = %record.status,
            "ステータスレコードを保存"
        );
        Ok(())
    }

    async fn exists(&self, article_id: ArticleId) -> InfraResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM translation_status WHERE page_id = $1)",
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| InfraError::database_query("ステータスレコードの存在確認", e))?;

        Ok(exists)
    }
}

/// メモリ上に保持するストア実装
///
/// テストや試行用。一意性チェックと書き込みを1つのロック内で行う。
#[derive(Default)]
pub struct MemoryStatusRecordStore {
    records: Mutex<HashMap<ArticleId, TranslationStatusRecord>>,
}

impl MemoryStatusRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存レコードを持った状態で作成する
    pub fn with_records<I: IntoIterator<Item = TranslationStatusRecord>>(records: I) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.article_id, record))
            .collect();
        Self {
            records: Mutex::new(map),
        }
    }

    /// 保持しているレコードの一覧（記事ID順）
    pub fn snapshot(&self) -> Vec<TranslationStatusRecord> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by_key(|record| record.article_id);
        all
    }
}

#[async_trait]
impl StatusRecordStore for MemoryStatusRecordStore {
    async fn get(&self, article_id: ArticleId) -> InfraResult<Option<TranslationStatusRecord>> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.get(&article_id).cloned())
    }

    async fn save(&self, record: &TranslationStatusRecord) -> SaveResult<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(name) = record.suggestion() {
            let conflict = records
                .values()
                .filter(|other| other.article_id != record.article_id)
                .filter(|other| other.suggestion() == Some(name))
                .map(|other| other.article_id)
                .min();
            if let Some(conflicting_article_id) = conflict {
                return Err(DuplicateSuggestionError {
                    conflicting_article_id,
                    suggested_name: name.to_string(),
                }
                .into());
            }
        }

        // 外部で管理される項目は既存の値を引き継ぐ
        let mut stored = record.clone();
        stored.suggested_name = record.suggestion().map(str::to_string);
        if let Some(existing) = records.get(&record.article_id) {
            stored.page_views = existing.page_views;
            stored.main_category = existing.main_category.clone();
        } else {
            let fresh = TranslationStatusRecord::new(record.article_id);
            stored.page_views = fresh.page_views;
            stored.main_category = fresh.main_category;
        }
        records.insert(record.article_id, stored);
        Ok(())
    }

    async fn exists(&self, article_id: ArticleId) -> InfraResult<bool> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.contains_key(&article_id))
    }
}
