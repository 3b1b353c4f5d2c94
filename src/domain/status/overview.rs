use super::filter::Predicate;
use super::model::{
    derive_effective_status, ArticleId, ArticleMetadata, TranslationStatus,
    TranslationStatusRecord,
};
use crate::types::{InfraError, InfraResult, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

// 一覧の1行（記事メタデータ・ステータスレコード・外部翻訳リンクの結合）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewRow {
    pub article: ArticleMetadata,
    pub record: Option<TranslationStatusRecord>,
    /// 翻訳先言語の記事タイトル（外部翻訳リンク）
    pub translation_link: Option<String>,
}

impl OverviewRow {
    pub fn has_translation_link(&self) -> bool {
        self.translation_link.is_some()
    }

    /// 保存されているステータス（レコードが無ければNone）
    pub fn stored_status(&self) -> Option<TranslationStatus> {
        self.record.as_ref().map(|r| r.status)
    }

    /// 表示用の実効ステータス
    pub fn effective_status(&self) -> TranslationStatus {
        derive_effective_status(self.record.as_ref(), self.has_translation_link())
    }

    pub fn page_views(&self) -> Option<i64> {
        self.record.as_ref().map(|r| r.page_views)
    }
}

/// 並べ替え可能な列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Title,
    Status,
    PageViews,
}

impl SortColumn {
    fn sql(&self) -> &'static str {
        match self {
            Self::Title => "p.page_title COLLATE \"C\"",
            Self::Status => "ts.status COLLATE \"C\"",
            Self::PageViews => "ts.page_views",
        }
    }
}

impl FromStr for SortColumn {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" | "page_title" => Ok(Self::Title),
            "status" => Ok(Self::Status),
            "pageviews" | "page_views" => Ok(Self::PageViews),
            other => Err(ValidationError::new(
                "sort",
                format!("並べ替えできない列です: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// 1ページの表示件数（100, 500, 1000, 5000のいずれか）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize(u32);

impl PageSize {
    pub const CHOICES: [u32; 4] = [100, 500, 1000, 5000];
    pub const DEFAULT: PageSize = PageSize(500);

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::CHOICES.contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::new(
                "limit",
                format!(
                    "表示件数は{:?}のいずれかを指定してください: {}",
                    Self::CHOICES,
                    value
                ),
            ))
        }
    }
}

impl FromStr for PageSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| ValidationError::new("limit", format!("数値ではありません: {}", s)))?;
        Self::try_from(value)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 一覧の並び順とページ位置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewPage {
    pub sort: SortColumn,
    pub direction: SortDirection,
    pub limit: PageSize,
    pub offset: u32,
}

// 一覧の対象となる記事の範囲（設定から決まる）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewScope {
    /// 外部翻訳リンクの言語コード
    pub target_language: String,
    /// 記事種別を保持するページプロパティ名
    pub article_type_property: String,
    /// 対象とする名前空間
    pub namespace: i32,
}

impl Default for OverviewScope {
    fn default() -> Self {
        Self {
            target_language: "ar".to_string(),
            article_type_property: "ArticleType".to_string(),
            namespace: 0,
        }
    }
}

impl OverviewScope {
    /// 名前空間が対象でリダイレクトでない記事か
    pub fn contains(&self, article: &ArticleMetadata) -> bool {
        article.namespace == self.namespace && !article.is_redirect
    }
}

/// 並べ替えキーの比較（バイト順。PostgreSQLの既定と同じくNULLは昇順で末尾）
fn compare_rows(a: &OverviewRow, b: &OverviewRow, sort: SortColumn) -> Ordering {
    fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match sort {
        SortColumn::Title => a.article.title.cmp(&b.article.title),
        SortColumn::Status => nulls_last(
            a.stored_status().map(|s| s.as_code()),
            b.stored_status().map(|s| s.as_code()),
        ),
        SortColumn::PageViews => nulls_last(a.page_views(), b.page_views()),
    }
}

/// メモリ上の行に条件・並べ替え・ページングを適用する
///
/// `search_overview` と同じ順序で同じ行を返す。
pub fn select_rows<'a>(
    rows: &'a [OverviewRow],
    scope: &OverviewScope,
    predicate: &Predicate,
    page: &OverviewPage,
) -> Vec<&'a OverviewRow> {
    let mut selected: Vec<&OverviewRow> = rows
        .iter()
        .filter(|row| scope.contains(&row.article) && predicate.evaluate(row))
        .collect();

    selected.sort_by(|a, b| {
        let ordering = match page.direction {
            SortDirection::Ascending => compare_rows(a, b, page.sort),
            SortDirection::Descending => compare_rows(b, a, page.sort),
        };
        ordering.then(a.article.article_id.cmp(&b.article.article_id))
    });

    selected
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit.get() as usize)
        .collect()
}

// 一覧クエリの結果行（テーブル定義の列名と一致）
#[derive(Debug, FromRow)]
struct OverviewRowRecord {
    page_id: ArticleId,
    page_namespace: i32,
    page_title: String,
    page_is_redirect: bool,
    article_type: Option<String>,
    translation_link: Option<String>,
    record_page_id: Option<ArticleId>,
    status: Option<String>,
    suggested_name: Option<String>,
    translator: Option<String>,
    project: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    word_count: Option<i32>,
    comments: Option<String>,
    page_views: Option<i64>,
    main_category: Option<String>,
}

impl TryFrom<OverviewRowRecord> for OverviewRow {
    type Error = InfraError;

    fn try_from(row: OverviewRowRecord) -> Result<Self, Self::Error> {
        let record = match row.record_page_id {
            Some(article_id) => {
                let code = row.status.unwrap_or_default();
                let status = TranslationStatus::from_code(&code)
                    .ok_or_else(|| InfraError::corrupt_value("translation_status.status", code))?;
                Some(TranslationStatusRecord {
                    article_id,
                    status,
                    suggested_name: row.suggested_name,
                    translator: row.translator,
                    project: row.project,
                    start_date: row.start_date,
                    end_date: row.end_date,
                    word_count: row.word_count,
                    comments: row.comments,
                    page_views: row.page_views.unwrap_or_default(),
                    main_category: row.main_category,
                })
            }
            None => None,
        };

        Ok(OverviewRow {
            article: ArticleMetadata {
                article_id: row.page_id,
                namespace: row.page_namespace,
                title: row.page_title,
                is_redirect: row.page_is_redirect,
                article_type: row.article_type,
            },
            record,
            translation_link: row.translation_link,
        })
    }
}

const OVERVIEW_COLUMNS_SQL: &str = r#"
        SELECT
            p.page_id,
            p.page_namespace,
            p.page_title,
            p.page_is_redirect,
            pp.pp_value AS article_type,
            ll.ll_title AS translation_link,
            ts.page_id AS record_page_id,
            ts.status,
            ts.suggested_name,
            ts.translator,
            ts.project,
            ts.start_date,
            ts.end_date,
            ts.word_count,
            ts.comments,
            ts.page_views,
            ts.main_category
        "#;

/// 結合ビューのFROM句と対象範囲の条件を追記する（続けて条件を書ける状態で終わる）
fn push_overview_source<'args>(qb: &mut QueryBuilder<'args, Postgres>, scope: &OverviewScope) {
    qb.push(
        r#"
        FROM page p
        LEFT JOIN translation_status ts ON p.page_id = ts.page_id
        LEFT JOIN langlinks ll ON p.page_id = ll.ll_from AND ll.ll_lang = "#,
    );
    qb.push_bind(scope.target_language.clone());
    qb.push(" LEFT JOIN page_props pp ON p.page_id = pp.pp_page AND pp.pp_propname = ");
    qb.push_bind(scope.article_type_property.clone());
    qb.push(" WHERE p.page_namespace = ");
    qb.push_bind(scope.namespace);
    qb.push(" AND NOT p.page_is_redirect AND ");
}

/// 条件に一致する一覧の1ページ分を取得する
pub async fn search_overview(
    pool: &PgPool,
    scope: &OverviewScope,
    predicate: &Predicate,
    page: &OverviewPage,
) -> InfraResult<Vec<OverviewRow>> {
    let mut qb = QueryBuilder::<Postgres>::new(OVERVIEW_COLUMNS_SQL);
    push_overview_source(&mut qb, scope);
    predicate.push_sql(&mut qb);

    let direction = match page.direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    };
    qb.push(format!(
        " ORDER BY {} {}, p.page_id ASC",
        page.sort.sql(),
        direction
    ));
    qb.push(" LIMIT ").push_bind(i64::from(page.limit.get()));
    qb.push(" OFFSET ").push_bind(i64::from(page.offset));

    let records = qb
        .build_query_as::<OverviewRowRecord>()
        .fetch_all(pool)
        .await
        .map_err(|e| InfraError::database_query("翻訳状況一覧の取得", e))?;

    records.into_iter().map(OverviewRow::try_from).collect()
}

/// 条件に一致する件数を取得する
pub async fn count_overview(
    pool: &PgPool,
    scope: &OverviewScope,
    predicate: &Predicate,
) -> InfraResult<i64> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
    push_overview_source(&mut qb, scope);
    predicate.push_sql(&mut qb);

    let (count,): (i64,) = qb
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(|e| InfraError::database_query("翻訳状況一覧の件数取得", e))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::filter::{build_predicate, FilterCriteria, StatusFilter};

    fn row(id: ArticleId, title: &str, page_views: Option<i64>) -> OverviewRow {
        OverviewRow {
            article: ArticleMetadata {
                article_id: id,
                namespace: 0,
                title: title.to_string(),
                is_redirect: false,
                article_type: None,
            },
            record: page_views.map(|views| {
                let mut record = TranslationStatusRecord::new(id);
                record.page_views = views;
                record
            }),
            translation_link: None,
        }
    }

    fn ids(rows: &[&OverviewRow]) -> Vec<ArticleId> {
        rows.iter().map(|r| r.article.article_id).collect()
    }

    // ページング・並べ替え
    mod paging {
        use super::*;

        #[test]
        fn test_page_size_choices() {
            assert_eq!(PageSize::default().get(), 500);
            for choice in PageSize::CHOICES {
                assert_eq!(PageSize::try_from(choice).unwrap().get(), choice);
            }
            assert!(PageSize::try_from(250).is_err());
            assert!("abc".parse::<PageSize>().is_err());
            assert_eq!("1000".parse::<PageSize>().unwrap().get(), 1000);
        }

        #[test]
        fn test_sort_column_parse() {
            assert_eq!("title".parse::<SortColumn>().unwrap(), SortColumn::Title);
            assert_eq!("pageviews".parse::<SortColumn>().unwrap(), SortColumn::PageViews);
            let err = "comments".parse::<SortColumn>().unwrap_err();
            assert_eq!(err.field, "sort");
        }

        #[test]
        fn test_select_rows_sorts_by_title_by_default() {
            let rows = vec![row(1, "Cholera", None), row(2, "Anemia", None), row(3, "Burns", None)];
            let selected = select_rows(
                &rows,
                &OverviewScope::default(),
                &Predicate::always(),
                &OverviewPage::default(),
            );
            assert_eq!(ids(&selected), vec![2, 3, 1]);
        }

        #[test]
        fn test_select_rows_page_views_descending_puts_missing_first() {
            let rows = vec![
                row(1, "A", Some(10)),
                row(2, "B", None),
                row(3, "C", Some(300)),
            ];
            let page = OverviewPage {
                sort: SortColumn::PageViews,
                direction: SortDirection::Descending,
                ..Default::default()
            };
            let selected = select_rows(&rows, &OverviewScope::default(), &Predicate::always(), &page);
            // NULLは昇順で末尾、降順で先頭
            assert_eq!(ids(&selected), vec![2, 3, 1]);
        }

        #[test]
        fn test_select_rows_applies_offset_and_limit() {
            let rows: Vec<OverviewRow> = (1..=250)
                .map(|i| row(i, &format!("Article_{:04}", i), None))
                .collect();
            let page = OverviewPage {
                limit: PageSize::try_from(100).unwrap(),
                offset: 200,
                ..Default::default()
            };
            let selected = select_rows(&rows, &OverviewScope::default(), &Predicate::always(), &page);
            assert_eq!(selected.len(), 50);
            assert_eq!(selected[0].article.article_id, 201);
        }
    }

    // 対象範囲と条件の組み合わせ
    mod scope {
        use super::*;

        #[test]
        fn test_redirects_and_other_namespaces_are_excluded() {
            let mut redirect = row(1, "Old_name", None);
            redirect.article.is_redirect = true;
            let mut talk = row(2, "Talk_page", None);
            talk.article.namespace = 1;
            let rows = vec![redirect, talk, row(3, "Article", None)];

            let selected = select_rows(
                &rows,
                &OverviewScope::default(),
                &Predicate::always(),
                &OverviewPage::default(),
            );
            assert_eq!(ids(&selected), vec![3]);
        }

        #[test]
        fn test_effective_status_in_rows() {
            let mut linked = row(1, "Linked", Some(5));
            linked.translation_link = Some("مرتبط".to_string());
            assert_eq!(linked.effective_status(), TranslationStatus::Translated);
            assert_eq!(linked.stored_status(), Some(TranslationStatus::Untranslated));

            let rows = vec![linked, row(2, "Plain", None)];
            let predicate = build_predicate(&FilterCriteria {
                status: StatusFilter::Translated,
                ..Default::default()
            });
            let selected =
                select_rows(&rows, &OverviewScope::default(), &predicate, &OverviewPage::default());
            assert_eq!(ids(&selected), vec![1]);
        }
    }
}
