//! CLI出力の整形（一覧表・JSON・1記事の詳細）

use serde::Serialize;
use translation_manager::domain::status::{
    is_status_editable, ArticleMetadata, OverviewRow, TranslationStatus,
    TranslationStatusRecord, OVERVIEW_COLUMNS,
};
use translation_manager::types::DuplicateSuggestionError;

const EMPTY_CELL: &str = "-";

fn text(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => EMPTY_CELL.to_string(),
    }
}

fn value<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| EMPTY_CELL.to_string(), |v| v.to_string())
}

/// DBキー形式のタイトルを表示用に戻す
pub fn display_title(title: &str) -> String {
    title.replace('_', " ")
}

fn cell(row: &OverviewRow, key: &str) -> String {
    let record = row.record.as_ref();
    match key {
        "page_title" => display_title(&row.article.title),
        "actual_translation" => text(row.translation_link.as_deref()),
        "suggested_name" => text(record.and_then(|r| r.suggested_name.as_deref())),
        "wordcount" => value(record.and_then(|r| r.word_count)),
        "status" => row.effective_status().as_code().to_string(),
        "translator" => text(record.and_then(|r| r.translator.as_deref())),
        "project" => text(record.and_then(|r| r.project.as_deref())),
        "start_date" => value(record.and_then(|r| r.start_date)),
        "end_date" => value(record.and_then(|r| r.end_date)),
        "comments" => text(record.and_then(|r| r.comments.as_deref())),
        "pageviews" => value(row.page_views()),
        "main_category" => text(record.and_then(|r| r.main_category.as_deref())),
        "article_type" => text(row.article.article_type.as_deref()),
        // 操作列は記事ID
        "actions" => row.article.article_id.to_string(),
        _ => EMPTY_CELL.to_string(),
    }
}

/// 一覧をタブ区切りの表にする（1行目は列キー）
pub fn overview_table(rows: &[OverviewRow]) -> String {
    let header: Vec<&str> = OVERVIEW_COLUMNS.iter().map(|c| c.key).collect();
    let mut out = header.join("\t");
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = OVERVIEW_COLUMNS.iter().map(|c| cell(row, c.key)).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonRow<'a> {
    #[serde(flatten)]
    row: &'a OverviewRow,
    effective_status: TranslationStatus,
}

#[derive(Serialize)]
struct JsonOverview<'a> {
    total: i64,
    offset: u32,
    rows: Vec<JsonRow<'a>>,
}

/// 一覧をJSONにする
pub fn overview_json(rows: &[OverviewRow], total: i64, offset: u32) -> serde_json::Result<String> {
    let overview = JsonOverview {
        total,
        offset,
        rows: rows
            .iter()
            .map(|row| JsonRow {
                row,
                effective_status: row.effective_status(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&overview)
}

/// 1記事のステータス詳細
pub fn record_details(
    article: &ArticleMetadata,
    record: Option<&TranslationStatusRecord>,
    translation_link: Option<&str>,
) -> String {
    let row = OverviewRow {
        article: article.clone(),
        record: record.cloned(),
        translation_link: translation_link.map(str::to_string),
    };
    let editable = is_status_editable(record, translation_link.is_some());

    let mut lines = vec![
        format!("記事: {} ({})", display_title(&article.title), article.article_id),
        format!(
            "実効ステータス: {}{}",
            row.effective_status(),
            if editable { "" } else { "（編集不可）" }
        ),
    ];
    match record {
        Some(record) => {
            lines.push(format!("保存ステータス: {}", record.status));
            for column in OVERVIEW_COLUMNS.iter().filter(|c| {
                !matches!(c.key, "actions" | "page_title" | "status" | "article_type")
            }) {
                lines.push(format!("{}: {}", column.key, cell(&row, column.key)));
            }
        }
        None => {
            lines.push("保存ステータス: (レコードなし)".to_string());
            lines.push(format!("actual_translation: {}", text(translation_link)));
        }
    }
    lines.join("\n")
}

/// 翻訳名候補の重複を利用者向けに表示する
pub fn duplicate_message(dup: &DuplicateSuggestionError, conflicting_title: Option<&str>) -> String {
    match conflicting_title {
        Some(title) => format!(
            "翻訳名候補「{}」は記事「{}」({}) で既に使われています",
            dup.suggested_name,
            display_title(title),
            dup.conflicting_article_id
        ),
        None => dup.to_string(),
    }
}
