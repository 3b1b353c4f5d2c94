//! PostgreSQL上の一覧クエリのテスト（`--features db-tests` と DATABASE_URL が必要）
#![cfg(feature = "db-tests")]

use chrono::NaiveDate;
use sqlx::PgPool;
use translation_manager::domain::status::{
    build_predicate, count_overview, search_overview, select_rows, ArticleId, FilterCriteria,
    OverviewPage, OverviewRow, OverviewScope, PageSize, Predicate, SortColumn, SortDirection,
    StatusFilter,
};

fn ids(rows: &[OverviewRow]) -> Vec<ArticleId> {
    rows.iter().map(|row| row.article.article_id).collect()
}

fn status(filter: StatusFilter) -> FilterCriteria {
    FilterCriteria {
        status: filter,
        ..Default::default()
    }
}

async fn search(pool: &PgPool, criteria: &FilterCriteria, page: &OverviewPage) -> Vec<ArticleId> {
    let scope = OverviewScope::default();
    let predicate = build_predicate(criteria);
    let rows = search_overview(pool, &scope, &predicate, page)
        .await
        .expect("一覧の取得に失敗");
    let total = count_overview(pool, &scope, &predicate)
        .await
        .expect("件数の取得に失敗");
    if page.offset == 0 && rows.len() < page.limit.get() as usize {
        assert_eq!(total, rows.len() as i64);
    }
    ids(&rows)
}

#[sqlx::test(fixtures("../fixtures/status_basic.sql"))]
async fn test_status_filters(pool: PgPool) -> Result<(), anyhow::Error> {
    let page = OverviewPage::default();

    // リダイレクトと他の名前空間は含まれない
    assert_eq!(search(&pool, &status(StatusFilter::All), &page).await, vec![5, 4, 2, 3, 1, 8]);
    assert_eq!(search(&pool, &status(StatusFilter::Translated), &page).await, vec![5, 4]);
    assert_eq!(search(&pool, &status(StatusFilter::Review), &page).await, vec![1]);
    assert_eq!(search(&pool, &status(StatusFilter::Untranslated), &page).await, vec![2, 3]);
    assert_eq!(search(&pool, &status(StatusFilter::Unsuggested), &page).await, vec![5, 2, 3]);
    assert!(search(&pool, &status(StatusFilter::Unknown("bogus".into())), &page)
        .await
        .is_empty());

    println!("✅ ステータス絞り込みテスト成功");
    Ok(())
}

#[sqlx::test(fixtures("../fixtures/status_basic.sql"))]
async fn test_field_filters(pool: PgPool) -> Result<(), anyhow::Error> {
    let page = OverviewPage::default();

    let title = FilterCriteria {
        page_title: Some(" MALARIA ".to_string()),
        ..Default::default()
    };
    assert_eq!(search(&pool, &title, &page).await, vec![1]);

    let views = FilterCriteria {
        min_page_views: Some(100),
        ..Default::default()
    };
    assert_eq!(search(&pool, &views, &page).await, vec![4, 1]);

    let article_type = FilterCriteria {
        article_type: Some("disease".to_string()),
        ..Default::default()
    };
    assert_eq!(search(&pool, &article_type, &page).await, vec![2, 1]);

    // 悪意のある入力も値としてバインドされる
    let hostile = FilterCriteria {
        page_title: Some("'; DROP TABLE translation_status; --".to_string()),
        translator: Some("' OR '1'='1".to_string()),
        ..Default::default()
    };
    assert!(search(&pool, &hostile, &page).await.is_empty());
    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM translation_status")
        .fetch_one(&pool)
        .await?;
    assert_eq!(remaining, 4);
    Ok(())
}

#[sqlx::test(fixtures("../fixtures/status_basic.sql"))]
async fn test_sort_and_paging(pool: PgPool) -> Result<(), anyhow::Error> {
    let criteria = FilterCriteria::default();

    // 降順ではレコードの無い記事（閲覧数NULL）が先頭
    let by_views = OverviewPage {
        sort: SortColumn::PageViews,
        direction: SortDirection::Descending,
        ..Default::default()
    };
    assert_eq!(search(&pool, &criteria, &by_views).await, vec![2, 3, 1, 4, 5, 8]);

    let second_page = OverviewPage {
        limit: PageSize::try_from(100)?,
        offset: 4,
        ..Default::default()
    };
    assert_eq!(search(&pool, &criteria, &second_page).await, vec![1, 8]);
    Ok(())
}

// SQLとメモリ上の評価が同じ行を同じ順序で返す
#[sqlx::test(fixtures("../fixtures/status_basic.sql"))]
async fn test_sql_and_memory_agree(pool: PgPool) -> Result<(), anyhow::Error> {
    let scope = OverviewScope::default();
    let everything = OverviewPage {
        limit: PageSize::try_from(5000)?,
        ..Default::default()
    };
    let all_rows = search_overview(&pool, &scope, &Predicate::always(), &everything).await?;

    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
    let mut criteria_list: Vec<FilterCriteria> = [
        StatusFilter::All,
        StatusFilter::Review,
        StatusFilter::Unsuggested,
        StatusFilter::Untranslated,
        StatusFilter::Translated,
    ]
    .into_iter()
    .map(status)
    .collect();
    criteria_list.extend([
        FilterCriteria {
            start_date_from: date(2024, 3, 1),
            end_date_to: date(2024, 4, 30),
            ..Default::default()
        },
        FilterCriteria {
            start_date_to: date(2024, 2, 28),
            ..Default::default()
        },
        FilterCriteria {
            end_date_from: date(2024, 4, 30),
            ..Default::default()
        },
        FilterCriteria {
            min_page_views: Some(800),
            ..Default::default()
        },
        FilterCriteria {
            translator: Some("Dana".to_string()),
            project: Some("Spring".to_string()),
            ..Default::default()
        },
        FilterCriteria {
            main_category: Some("Health".to_string()),
            status: StatusFilter::Untranslated,
            ..Default::default()
        },
        FilterCriteria {
            article_type: Some("disease".to_string()),
            min_page_views: Some(1),
            ..Default::default()
        },
    ]);

    let sorts = [SortColumn::Title, SortColumn::Status, SortColumn::PageViews];
    for criteria in &criteria_list {
        let predicate = build_predicate(criteria);
        for sort in sorts {
            for direction in [SortDirection::Ascending, SortDirection::Descending] {
                let page = OverviewPage {
                    sort,
                    direction,
                    ..everything.clone()
                };
                let from_sql = search_overview(&pool, &scope, &predicate, &page).await?;
                let in_memory: Vec<ArticleId> = select_rows(&all_rows, &scope, &predicate, &page)
                    .into_iter()
                    .map(|row| row.article.article_id)
                    .collect();
                assert_eq!(
                    ids(&from_sql),
                    in_memory,
                    "{:?} / {:?} / {:?}",
                    criteria,
                    sort,
                    direction
                );
            }
        }
    }

    // 期間指定は記事1の開始日・終了日のみに一致する
    assert_eq!(search(&pool, &criteria_list[5], &everything).await, vec![1]);
    assert!(search(&pool, &criteria_list[6], &everything).await.is_empty());
    assert_eq!(search(&pool, &criteria_list[7], &everything).await, vec![1]);
    // Healthの記事4は翻訳リンクがあり、記事1はレビュー中なので未翻訳に当たらない
    assert!(search(&pool, &criteria_list[10], &everything).await.is_empty());
    assert_eq!(search(&pool, &criteria_list[9], &everything).await, vec![1]);
    Ok(())
}
