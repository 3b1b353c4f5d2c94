use super::overview::SortColumn;

// 一覧の列定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverviewColumn {
    /// 行データのフィールド名
    pub key: &'static str,
    /// 見出しのメッセージキー（翻訳はビュー側で行う）
    pub label_message: &'static str,
    /// 並べ替えに使える場合の列
    pub sort: Option<SortColumn>,
}

const fn column(key: &'static str, label_message: &'static str) -> OverviewColumn {
    OverviewColumn {
        key,
        label_message,
        sort: None,
    }
}

const fn sortable(
    key: &'static str,
    label_message: &'static str,
    sort: SortColumn,
) -> OverviewColumn {
    OverviewColumn {
        key,
        label_message,
        sort: Some(sort),
    }
}

/// 一覧の列（表示順）
pub const OVERVIEW_COLUMNS: [OverviewColumn; 14] = [
    column("actions", "ext-tm-overview-tableheader-actions"),
    sortable("page_title", "ext-tm-overview-tableheader-title", SortColumn::Title),
    column("actual_translation", "ext-tm-overview-tableheader-langlink"),
    column("suggested_name", "ext-tm-overview-tableheader-suggestedname"),
    column("wordcount", "ext-tm-overview-tableheader-wordcount"),
    sortable("status", "ext-tm-overview-tableheader-status", SortColumn::Status),
    column("translator", "ext-tm-overview-tableheader-translator"),
    column("project", "ext-tm-overview-tableheader-project"),
    column("start_date", "ext-tm-overview-tableheader-startdate"),
    column("end_date", "ext-tm-overview-tableheader-enddate"),
    column("comments", "ext-tm-overview-tableheader-comments"),
    sortable("pageviews", "ext-tm-overview-tableheader-pageviews", SortColumn::PageViews),
    column("main_category", "ext-tm-overview-tableheader-maincategory"),
    column("article_type", "ext-tm-overview-tableheader-articletype"),
];

/// フィールド名から列定義を探す
pub fn find_column(key: &str) -> Option<&'static OverviewColumn> {
    OVERVIEW_COLUMNS.iter().find(|c| c.key == key)
}
