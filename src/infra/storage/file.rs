use crate::types::{InfraError, InfraResult};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;

/// ファイルパスからBufReaderを作成する
/// パースやデータ変換は呼び出し側で行う
pub fn load_file(file_path: &str) -> InfraResult<BufReader<File>> {
    let file = File::open(file_path).map_err(|e| InfraError::file_system(file_path, e))?;
    Ok(BufReader::new(file))
}

/// YAMLファイルからSerdeでDeserializeできる型を読み込む
pub fn load_yaml_from_file<T: DeserializeOwned>(file_path: &str) -> InfraResult<T> {
    let buf_reader = load_file(file_path)?;
    serde_yaml::from_reader(buf_reader).map_err(|e| InfraError::yaml(file_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_load_yaml_from_file() {
        let dir = TempDir::new().expect("一時ディレクトリの作成に失敗");
        let path = dir.path().join("sample.yaml");
        fs::write(&path, "name: test\ncount: 3\n").expect("テストファイルの作成に失敗");

        let sample: Sample = load_yaml_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: "test".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn test_load_non_existing_file() {
        // 存在しないファイルでエラーになることを確認
        let result = load_file("non_existent_file.txt");
        assert!(matches!(result, Err(InfraError::FileSystem { .. })));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = TempDir::new().expect("一時ディレクトリの作成に失敗");
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "name: [unclosed\n").expect("テストファイルの作成に失敗");

        let result: InfraResult<Sample> = load_yaml_from_file(path.to_str().unwrap());
        assert!(matches!(result, Err(InfraError::Yaml { .. })));
    }
}
