use crate::domain::status::{OverviewScope, PageSize};
use crate::infra::storage::file::load_yaml_from_file;
use crate::types::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// 設定ファイルの既定パス
pub const DEFAULT_CONFIG_PATH: &str = "config/translation_manager.yaml";

// YAMLファイルの構造に対応する型（全項目省略可）
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    target_language: Option<String>,
    article_type_property: Option<String>,
    content_namespace: Option<i32>,
    default_page_size: Option<u32>,
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// 一覧の対象範囲（翻訳先言語・記事種別プロパティ・名前空間）
    pub scope: OverviewScope,
    /// 表示件数の既定値
    pub default_page_size: PageSize,
}

impl AppConfig {
    /// 環境変数と設定ファイルから設定を読み込む
    ///
    /// - `TM_CONFIG_PATH`: 設定ファイルのパス（未指定なら既定パス、ファイルが無ければ既定値）
    /// - `TM_TARGET_LANGUAGE`: 翻訳先言語コードの上書き
    pub fn load() -> ConfigResult<Self> {
        let path = env::var("TM_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;

        if let Ok(language) = env::var("TM_TARGET_LANGUAGE") {
            config.scope.target_language = validate_language(&language)?;
        }
        Ok(config)
    }

    /// 設定ファイルを読み込む（ファイルが存在しなければ既定値）
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let file: ConfigFile = load_yaml_from_file(path)
            .map_err(|e| ConfigError::unreadable_config_file(path, e.to_string()))?;
        Self::from_config_file(file)
    }

    fn from_config_file(file: ConfigFile) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(language) = file.target_language {
            config.scope.target_language = validate_language(&language)?;
        }
        if let Some(property) = file.article_type_property {
            if property.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "article_type_property が空です",
                ));
            }
            config.scope.article_type_property = property;
        }
        if let Some(namespace) = file.content_namespace {
            config.scope.namespace = namespace;
        }
        if let Some(size) = file.default_page_size {
            config.default_page_size = PageSize::try_from(size)
                .map_err(|e| ConfigError::invalid_value(e.reason))?;
        }
        Ok(config)
    }
}

/// データベースURLを環境変数から取得する
pub fn database_url() -> ConfigResult<String> {
    env::var("DATABASE_URL").map_err(|_| ConfigError::missing_env_var("DATABASE_URL"))
}

fn validate_language(language: &str) -> ConfigResult<String> {
    let language = language.trim();
    if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ConfigError::invalid_value(format!(
            "言語コードが不正です: {}",
            language
        )));
    }
    Ok(language.to_string())
}
