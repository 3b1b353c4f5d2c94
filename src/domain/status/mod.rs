pub mod columns;
pub mod filter;
pub mod model;
pub mod overview;
pub mod repository;

// 公開APIの再エクスポート

// model.rsから
pub use model::{
    derive_effective_status, is_status_editable, ArticleId, ArticleMetadata, TranslationStatus,
    TranslationStatusRecord,
};

// filter.rsから
pub use filter::{build_predicate, normalize_title_filter, FilterCriteria, Predicate, StatusFilter};

// overview.rsから
pub use overview::{
    count_overview, search_overview, select_rows, OverviewPage, OverviewRow, OverviewScope,
    PageSize, SortColumn, SortDirection,
};

// repository.rsから
pub use repository::{MemoryStatusRecordStore, PgStatusRecordStore, StatusRecordStore};

// columns.rsから
pub use columns::{find_column, OverviewColumn, OVERVIEW_COLUMNS};
