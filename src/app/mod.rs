pub mod status_editor;

// 便利のため、よく使用される型を再エクスポート
pub use status_editor::{apply_edit, RawEditFields, StatusEdit};
