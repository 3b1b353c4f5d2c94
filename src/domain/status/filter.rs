use super::model::TranslationStatus;
use super::overview::OverviewRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ステータス絞り込みの選択肢（保存値のenumとは別物）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    /// 絞り込みなし
    #[default]
    All,
    /// レビュー待ちかつ未翻訳
    Review,
    /// 現状は `Review` と同じ条件
    Prereview,
    /// 未翻訳・候補名なし・対象外でない
    Unsuggested,
    /// 未翻訳（レコード無しを含む）
    Untranslated,
    /// 外部リンクあり、または翻訳済みとして保存
    Translated,
    /// 保存値との完全一致
    Exactly(TranslationStatus),
    /// どのステータスコードにも当たらない値
    Unknown(String),
}

impl FromStr for StatusFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = match s.trim() {
            "" | "all" => Self::All,
            "review" => Self::Review,
            "prereview" => Self::Prereview,
            "unsuggested" => Self::Unsuggested,
            "untranslated" => Self::Untranslated,
            "translated" => Self::Translated,
            other => match TranslationStatus::from_code(other) {
                Some(status) => Self::Exactly(status),
                None => Self::Unknown(other.to_string()),
            },
        };
        Ok(filter)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Review => f.write_str("review"),
            Self::Prereview => f.write_str("prereview"),
            Self::Unsuggested => f.write_str("unsuggested"),
            Self::Untranslated => f.write_str("untranslated"),
            Self::Translated => f.write_str("translated"),
            Self::Exactly(status) => f.write_str(status.as_code()),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

// 一覧の絞り込み条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub page_title: Option<String>,
    pub min_page_views: Option<i64>,
    pub start_date_from: Option<NaiveDate>,
    pub start_date_to: Option<NaiveDate>,
    pub end_date_from: Option<NaiveDate>,
    pub end_date_to: Option<NaiveDate>,
    pub article_type: Option<String>,
    pub translator: Option<String>,
    pub project: Option<String>,
    pub main_category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    StartDate,
    EndDate,
}

impl DateColumn {
    fn sql(&self) -> &'static str {
        match self {
            Self::StartDate => "ts.start_date",
            Self::EndDate => "ts.end_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColumn {
    ArticleType,
    Translator,
    Project,
    MainCategory,
}

impl TextColumn {
    fn sql(&self) -> &'static str {
        match self {
            Self::ArticleType => "pp.pp_value",
            Self::Translator => "ts.translator",
            Self::Project => "ts.project",
            Self::MainCategory => "ts.main_category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Always,
    Never,
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    HasTranslationLink,
    RecordMissing,
    StatusIs(TranslationStatus),
    SuggestionMissing,
    /// 正規化済み（小文字・アンダースコア区切り）の部分文字列
    TitleContains(String),
    PageViewsAtLeast(i64),
    DateOnOrAfter(DateColumn, NaiveDate),
    DateOnOrBefore(DateColumn, NaiveDate),
    TextEquals(TextColumn, String),
}

/// 結合行 {記事メタデータ, ステータスレコード, 外部翻訳リンク} に対する条件
///
/// 評価方法は2通りあり、どちらも同じ行に同じ結果を返す。
/// - `evaluate`: メモリ上の `OverviewRow` に対する評価
/// - `push_sql`: PostgreSQLのWHERE句として描画（値は全てバインド）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(Node);

impl Predicate {
    /// 常に真
    pub fn always() -> Self {
        Self(Node::Always)
    }

    /// 常に偽
    pub fn never() -> Self {
        Self(Node::Never)
    }

    pub fn has_translation_link() -> Self {
        Self(Node::HasTranslationLink)
    }

    pub fn record_missing() -> Self {
        Self(Node::RecordMissing)
    }

    pub fn status_is(status: TranslationStatus) -> Self {
        Self(Node::StatusIs(status))
    }

    pub fn suggestion_missing() -> Self {
        Self(Node::SuggestionMissing)
    }

    /// 正規化済みの文字列を受け取る（`normalize_title_filter` を参照）
    pub fn title_contains<S: Into<String>>(needle: S) -> Self {
        Self(Node::TitleContains(needle.into()))
    }

    pub fn page_views_at_least(min: i64) -> Self {
        Self(Node::PageViewsAtLeast(min))
    }

    pub fn date_on_or_after(column: DateColumn, date: NaiveDate) -> Self {
        Self(Node::DateOnOrAfter(column, date))
    }

    pub fn date_on_or_before(column: DateColumn, date: NaiveDate) -> Self {
        Self(Node::DateOnOrBefore(column, date))
    }

    pub fn text_equals<S: Into<String>>(column: TextColumn, value: S) -> Self {
        Self(Node::TextEquals(column, value.into()))
    }

    /// 全ての条件のAND。空なら常に真
    pub fn all<I: IntoIterator<Item = Predicate>>(predicates: I) -> Self {
        let mut nodes = Vec::new();
        for Predicate(node) in predicates {
            match node {
                Node::Always => {}
                Node::Never => return Self::never(),
                Node::And(inner) => nodes.extend(inner),
                other => nodes.push(other),
            }
        }
        match nodes.len() {
            0 => Self::always(),
            1 => Self(nodes.remove(0)),
            _ => Self(Node::And(nodes)),
        }
    }

    /// いずれかの条件のOR。空なら常に偽
    pub fn any<I: IntoIterator<Item = Predicate>>(predicates: I) -> Self {
        let mut nodes = Vec::new();
        for Predicate(node) in predicates {
            match node {
                Node::Never => {}
                Node::Always => return Self::always(),
                Node::Or(inner) => nodes.extend(inner),
                other => nodes.push(other),
            }
        }
        match nodes.len() {
            0 => Self::never(),
            1 => Self(nodes.remove(0)),
            _ => Self(Node::Or(nodes)),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::all([self, other])
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::any([self, other])
    }

    pub fn negate(self) -> Self {
        match self.0 {
            Node::Always => Self::never(),
            Node::Never => Self::always(),
            Node::Not(inner) => Self(*inner),
            other => Self(Node::Not(Box::new(other))),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self.0, Node::Always)
    }

    /// メモリ上の結合行に対して評価する
    pub fn evaluate(&self, row: &OverviewRow) -> bool {
        evaluate_node(&self.0, row)
    }

    /// WHERE句の一部としてSQLを追記する
    ///
    /// 各葉はNULLを返さない式として描画するため、外部結合で
    /// NULLになった列があってもNOT/ORの意味が変わらない。
    pub fn push_sql<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        push_node(&self.0, qb);
    }
}

fn evaluate_node(node: &Node, row: &OverviewRow) -> bool {
    match node {
        Node::Always => true,
        Node::Never => false,
        Node::And(nodes) => nodes.iter().all(|n| evaluate_node(n, row)),
        Node::Or(nodes) => nodes.iter().any(|n| evaluate_node(n, row)),
        Node::Not(inner) => !evaluate_node(inner, row),
        Node::HasTranslationLink => row.has_translation_link(),
        Node::RecordMissing => row.record.is_none(),
        Node::StatusIs(status) => row.stored_status() == Some(*status),
        Node::SuggestionMissing => row
            .record
            .as_ref()
            .and_then(|r| r.suggestion())
            .is_none(),
        Node::TitleContains(needle) => row.article.title.to_lowercase().contains(needle.as_str()),
        Node::PageViewsAtLeast(min) => row
            .record
            .as_ref()
            .map_or(false, |r| r.page_views >= *min),
        Node::DateOnOrAfter(column, date) => {
            date_value(row, *column).map_or(false, |value| value >= *date)
        }
        Node::DateOnOrBefore(column, date) => {
            date_value(row, *column).map_or(false, |value| value <= *date)
        }
        Node::TextEquals(column, value) => {
            text_value(row, *column).map_or(false, |actual| actual == value)
        }
    }
}

fn date_value(row: &OverviewRow, column: DateColumn) -> Option<NaiveDate> {
    let record = row.record.as_ref()?;
    match column {
        DateColumn::StartDate => record.start_date,
        DateColumn::EndDate => record.end_date,
    }
}

fn text_value(row: &OverviewRow, column: TextColumn) -> Option<&str> {
    match column {
        TextColumn::ArticleType => row.article.article_type.as_deref(),
        TextColumn::Translator => row.record.as_ref()?.translator.as_deref(),
        TextColumn::Project => row.record.as_ref()?.project.as_deref(),
        TextColumn::MainCategory => row.record.as_ref()?.main_category.as_deref(),
    }
}

fn push_node<'args>(node: &Node, qb: &mut QueryBuilder<'args, Postgres>) {
    match node {
        Node::Always => {
            qb.push("TRUE");
        }
        Node::Never => {
            qb.push("FALSE");
        }
        Node::And(nodes) => push_joined(nodes, " AND ", qb),
        Node::Or(nodes) => push_joined(nodes, " OR ", qb),
        Node::Not(inner) => {
            qb.push("NOT (");
            push_node(inner, qb);
            qb.push(")");
        }
        Node::HasTranslationLink => {
            qb.push("ll.ll_title IS NOT NULL");
        }
        Node::RecordMissing => {
            qb.push("ts.page_id IS NULL");
        }
        Node::StatusIs(status) => {
            qb.push("ts.status IS NOT DISTINCT FROM ")
                .push_bind(status.as_code());
        }
        Node::SuggestionMissing => {
            qb.push("COALESCE(ts.suggested_name, '') = ''");
        }
        Node::TitleContains(needle) => {
            qb.push("p.page_title ILIKE ")
                .push_bind(format!("%{}%", escape_like(needle)))
                .push(" ESCAPE '\\'");
        }
        Node::PageViewsAtLeast(min) => {
            qb.push("COALESCE(ts.page_views >= ")
                .push_bind(*min)
                .push(", FALSE)");
        }
        Node::DateOnOrAfter(column, date) => {
            qb.push(format!("COALESCE({} >= ", column.sql()))
                .push_bind(*date)
                .push(", FALSE)");
        }
        Node::DateOnOrBefore(column, date) => {
            qb.push(format!("COALESCE({} <= ", column.sql()))
                .push_bind(*date)
                .push(", FALSE)");
        }
        Node::TextEquals(column, value) => {
            qb.push(format!("{} IS NOT DISTINCT FROM ", column.sql()))
                .push_bind(value.clone());
        }
    }
}

fn push_joined<'args>(nodes: &[Node], separator: &str, qb: &mut QueryBuilder<'args, Postgres>) {
    qb.push("(");
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_node(node, qb);
    }
    qb.push(")");
}

/// LIKEのメタ文字をエスケープする
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// タイトル検索語をDBキー形式に正規化する
/// 前後の空白を除き、空白の連続をアンダースコア1つにして小文字化する
pub fn normalize_title_filter(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// ステータス絞り込みを条件に変換する
fn status_predicate(filter: &StatusFilter) -> Predicate {
    let untranslated = || Predicate::has_translation_link().negate();
    match filter {
        StatusFilter::All => Predicate::always(),
        StatusFilter::Review | StatusFilter::Prereview => {
            Predicate::status_is(TranslationStatus::Review).and(untranslated())
        }
        StatusFilter::Unsuggested => Predicate::all([
            untranslated(),
            Predicate::suggestion_missing(),
            Predicate::status_is(TranslationStatus::Irrelevant).negate(),
        ]),
        StatusFilter::Untranslated => untranslated().and(
            Predicate::record_missing().or(Predicate::status_is(TranslationStatus::Untranslated)),
        ),
        StatusFilter::Translated => Predicate::has_translation_link()
            .or(Predicate::status_is(TranslationStatus::Translated)),
        StatusFilter::Exactly(status) => Predicate::status_is(*status),
        // 保存値はステータスコードのいずれかなので一致する行は無い
        StatusFilter::Unknown(_) => Predicate::never(),
    }
}

/// 絞り込み条件から結果の条件を組み立てる
///
/// 有効な条件は全てANDで結合する。空文字や0の条件は無視する。
/// `end_date_to` は終了日に対して適用する。
pub fn build_predicate(criteria: &FilterCriteria) -> Predicate {
    let mut conditions = vec![status_predicate(&criteria.status)];

    if let Some(needle) = criteria
        .page_title
        .as_deref()
        .and_then(normalize_title_filter)
    {
        conditions.push(Predicate::title_contains(needle));
    }

    if let Some(min) = criteria.min_page_views.filter(|min| *min > 0) {
        conditions.push(Predicate::page_views_at_least(min));
    }

    let date_bounds = [
        (DateColumn::StartDate, criteria.start_date_from, criteria.start_date_to),
        (DateColumn::EndDate, criteria.end_date_from, criteria.end_date_to),
    ];
    for (column, from, to) in date_bounds {
        if let Some(from) = from {
            conditions.push(Predicate::date_on_or_after(column, from));
        }
        if let Some(to) = to {
            conditions.push(Predicate::date_on_or_before(column, to));
        }
    }

    let equality = [
        (TextColumn::ArticleType, &criteria.article_type),
        (TextColumn::Translator, &criteria.translator),
        (TextColumn::Project, &criteria.project),
        (TextColumn::MainCategory, &criteria.main_category),
    ];
    for (column, value) in equality {
        if let Some(value) = non_empty(value) {
            conditions.push(Predicate::text_equals(column, value));
        }
    }

    Predicate::all(conditions)
}
