mod render;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use translation_manager::app::{apply_edit, RawEditFields};
use translation_manager::domain::page::{find_page, find_translation_link};
use translation_manager::domain::status::{
    build_predicate, count_overview, search_overview, ArticleId, FilterCriteria, OverviewPage,
    PageSize, PgStatusRecordStore, SortColumn, SortDirection, StatusFilter, StatusRecordStore,
};
use translation_manager::infra::config::AppConfig;
use translation_manager::infra::db::{create_pool, initialize_database};
use translation_manager::types::EditError;

#[derive(Parser)]
#[command(
    name = "translation-manager",
    version,
    about = "記事ごとの翻訳状況を一覧・編集する"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// データベースのマイグレーションを実行する
    Migrate,
    /// 翻訳状況の一覧を表示する
    Overview(OverviewArgs),
    /// 1記事のステータスを表示する
    Show {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: ArticleId,
    },
    /// 1記事のステータスを編集する
    Edit {
        #[arg(value_name = "ARTICLE_ID")]
        article_id: ArticleId,
        /// 編集するフィールド（例: --field status=review --field suggested_name=Foo）
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Args)]
struct OverviewArgs {
    /// all, review, prereview, unsuggested, untranslated, translated またはステータスコード
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    /// タイトルの部分一致
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    min_page_views: Option<i64>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date_from: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date_to: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    end_date_from: Option<NaiveDate>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    end_date_to: Option<NaiveDate>,
    #[arg(long)]
    article_type: Option<String>,
    #[arg(long)]
    translator: Option<String>,
    #[arg(long)]
    project: Option<String>,
    #[arg(long)]
    main_category: Option<String>,
    /// title, status, pageviews
    #[arg(long, default_value = "title")]
    sort: SortColumn,
    /// 降順にする
    #[arg(long)]
    desc: bool,
    /// 100, 500, 1000, 5000（未指定なら設定の既定値）
    #[arg(long)]
    limit: Option<PageSize>,
    #[arg(long, default_value_t = 0)]
    offset: u32,
    /// JSONで出力する
    #[arg(long)]
    json: bool,
}

impl OverviewArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            status: self.status.clone(),
            page_title: self.title.clone(),
            min_page_views: self.min_page_views,
            start_date_from: self.start_date_from,
            start_date_to: self.start_date_to,
            end_date_from: self.end_date_from,
            end_date_to: self.end_date_to,
            article_type: self.article_type.clone(),
            translator: self.translator.clone(),
            project: self.project.clone(),
            main_category: self.main_category.clone(),
        }
    }

    fn page(&self, config: &AppConfig) -> OverviewPage {
        OverviewPage {
            sort: self.sort,
            direction: if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
            limit: self.limit.unwrap_or(config.default_page_size),
            offset: self.offset,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("KEY=VALUE の形式で指定してください: {}", raw))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("translation_manager=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("設定の読み込みに失敗しました")?;
    debug!(?config, "設定を読み込みました");

    let pool = create_pool()
        .await
        .context("データベースに接続できませんでした")?;

    match cli.command {
        Commands::Migrate => {
            initialize_database(&pool)
                .await
                .context("マイグレーションに失敗しました")?;
            println!("✅ マイグレーションが完了しました");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Overview(args) => run_overview(&pool, &config, &args).await,
        Commands::Show { article_id } => run_show(&pool, &config, article_id).await,
        Commands::Edit { article_id, fields } => {
            run_edit(&pool, &config, article_id, fields).await
        }
    }
}

async fn run_overview(pool: &PgPool, config: &AppConfig, args: &OverviewArgs) -> Result<ExitCode> {
    let predicate = build_predicate(&args.criteria());
    let page = args.page(config);

    let total = count_overview(pool, &config.scope, &predicate)
        .await
        .context("一覧の件数取得に失敗しました")?;
    let rows = search_overview(pool, &config.scope, &predicate, &page)
        .await
        .context("一覧の取得に失敗しました")?;

    if args.json {
        println!("{}", render::overview_json(&rows, total, page.offset)?);
    } else {
        print!("{}", render::overview_table(&rows));
        println!(
            "{}件中 {}件を表示（offset {}）",
            total,
            rows.len(),
            page.offset
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_show(pool: &PgPool, config: &AppConfig, article_id: ArticleId) -> Result<ExitCode> {
    let Some(article) = find_page(pool, &config.scope, article_id).await? else {
        eprintln!("❌ 記事 {} が見つかりません", article_id);
        return Ok(ExitCode::FAILURE);
    };

    let store = PgStatusRecordStore::new(pool.clone());
    let record = store
        .get(article_id)
        .await
        .context("ステータスレコードの取得に失敗しました")?;
    let link = find_translation_link(pool, &config.scope, article_id).await?;

    println!(
        "{}",
        render::record_details(&article, record.as_ref(), link.as_deref())
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_edit(
    pool: &PgPool,
    config: &AppConfig,
    article_id: ArticleId,
    fields: Vec<(String, String)>,
) -> Result<ExitCode> {
    // 存在しない記事はワークフローに渡さない
    let Some(article) = find_page(pool, &config.scope, article_id).await? else {
        eprintln!("❌ 記事 {} が見つかりません", article_id);
        return Ok(ExitCode::FAILURE);
    };

    let fields: RawEditFields = fields.into_iter().collect();
    let store = PgStatusRecordStore::new(pool.clone());

    match apply_edit(&store, article_id, &fields).await {
        Ok(record) => {
            println!(
                "✅ 記事「{}」のステータスを保存しました: {}",
                render::display_title(&article.title),
                record.status
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(EditError::Validation(e)) => {
            eprintln!("❌ {}: {}", e.field, e.reason);
            Ok(ExitCode::FAILURE)
        }
        Err(EditError::DuplicateSuggestion(dup)) => {
            let conflicting = find_page(pool, &config.scope, dup.conflicting_article_id)
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "重複先の記事タイトルを取得できませんでした");
                    None
                });
            eprintln!(
                "❌ {}",
                render::duplicate_message(&dup, conflicting.as_ref().map(|a| a.title.as_str()))
            );
            Ok(ExitCode::FAILURE)
        }
        Err(EditError::Persistence(e)) => {
            Err(anyhow::Error::new(e).context("ステータスの保存に失敗しました"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("suggested_name=Foo=Bar").unwrap(),
            ("suggested_name".to_string(), "Foo=Bar".to_string())
        );
        assert_eq!(
            parse_field("comments=").unwrap(),
            ("comments".to_string(), String::new())
        );
        assert!(parse_field("status").is_err());
        assert!(parse_field("=review").is_err());
    }

    #[test]
    fn test_overview_args() {
        let cli = Cli::try_parse_from([
            "translation-manager",
            "overview",
            "--status",
            "review",
            "--sort",
            "pageviews",
            "--desc",
            "--limit",
            "100",
            "--end-date-to",
            "2024-06-30",
        ])
        .unwrap();
        let Commands::Overview(args) = cli.command else {
            panic!("overviewサブコマンドになるべき");
        };
        let criteria = args.criteria();
        assert_eq!(criteria.status, StatusFilter::Review);
        assert_eq!(criteria.end_date_to, NaiveDate::from_ymd_opt(2024, 6, 30));

        let page = args.page(&AppConfig::default());
        assert_eq!(page.sort, SortColumn::PageViews);
        assert_eq!(page.direction, SortDirection::Descending);
        assert_eq!(page.limit.get(), 100);
    }

    #[test]
    fn test_overview_rejects_unsupported_limit() {
        assert!(Cli::try_parse_from(["translation-manager", "overview", "--limit", "250"]).is_err());
        let cli = Cli::try_parse_from(["translation-manager", "overview"]).unwrap();
        let Commands::Overview(args) = cli.command else {
            panic!("overviewサブコマンドになるべき");
        };
        assert_eq!(args.page(&AppConfig::default()).limit, PageSize::DEFAULT);
        assert_eq!(args.criteria().status, StatusFilter::All);
    }
}
