//! 記事メタデータ（外部のページストア）の読み取り
//!
//! page / langlinks / page_props は外部で管理されるテーブルで、ここからは参照のみ行う。

use crate::domain::status::{ArticleId, ArticleMetadata, OverviewScope};
use crate::types::{InfraError, InfraResult};
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct PageRow {
    page_id: ArticleId,
    page_namespace: i32,
    page_title: String,
    page_is_redirect: bool,
    article_type: Option<String>,
}

/// 記事IDから記事メタデータを取得する（存在しなければNone）
pub async fn find_page(
    pool: &PgPool,
    scope: &OverviewScope,
    article_id: ArticleId,
) -> InfraResult<Option<ArticleMetadata>> {
    let row: Option<PageRow> = sqlx::query_as(
        r#"
        SELECT p.page_id, p.page_namespace, p.page_title, p.page_is_redirect,
               pp.pp_value AS article_type
        FROM page p
        LEFT JOIN page_props pp ON p.page_id = pp.pp_page AND pp.pp_propname = $2
        WHERE p.page_id = $1
        "#,
    )
    .bind(article_id)
    .bind(&scope.article_type_property)
    .fetch_optional(pool)
    .await
    .map_err(|e| InfraError::database_query("記事メタデータの取得", e))?;

    Ok(row.map(|row| ArticleMetadata {
        article_id: row.page_id,
        namespace: row.page_namespace,
        title: row.page_title,
        is_redirect: row.page_is_redirect,
        article_type: row.article_type,
    }))
}

/// 翻訳先言語の記事タイトル（外部翻訳リンク）を取得する
pub async fn find_translation_link(
    pool: &PgPool,
    scope: &OverviewScope,
    article_id: ArticleId,
) -> InfraResult<Option<String>> {
    let link: Option<(String,)> =
        sqlx::query_as("SELECT ll_title FROM langlinks WHERE ll_from = $1 AND ll_lang = $2")
            .bind(article_id)
            .bind(&scope.target_language)
            .fetch_optional(pool)
            .await
            .map_err(|e| InfraError::database_query("外部翻訳リンクの取得", e))?;

    Ok(link.map(|(title,)| title))
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use super::*;

    #[sqlx::test(fixtures("../../fixtures/status_basic.sql"))]
    async fn test_find_page(pool: PgPool) -> Result<(), anyhow::Error> {
        let scope = OverviewScope::default();
        let page = find_page(&pool, &scope, 1).await?.expect("記事1が見つからない");
        assert_eq!(page.title, "Malaria");
        assert_eq!(page.article_type.as_deref(), Some("disease"));
        assert!(find_page(&pool, &scope, 999).await?.is_none());
        Ok(())
    }

    #[sqlx::test(fixtures("../../fixtures/status_basic.sql"))]
    async fn test_find_translation_link(pool: PgPool) -> Result<(), anyhow::Error> {
        let scope = OverviewScope::default();
        assert_eq!(
            find_translation_link(&pool, &scope, 4).await?.as_deref(),
            Some("حروق")
        );
        assert!(find_translation_link(&pool, &scope, 1).await?.is_none());
        Ok(())
    }
}
