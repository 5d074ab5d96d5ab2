//! INI file configuration adapter.

use crate::domain::error::ScoreTraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScoreTraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| ScoreTraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ScoreTraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ScoreTraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[run]
run_date = 2025-07-16
tickers = AAPL, MSFT ,GOOGL
lookback_days = 5
initial_cash = 1000000.5
verbose_entries = yes

[paths]
price_dir = data
output_dir = docs
"#;

    #[test]
    fn from_string_parses_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("run", "run_date"),
            Some("2025-07-16".to_string())
        );
        assert_eq!(adapter.get_string("paths", "output_dir"), Some("docs".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("run", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_and_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("run", "lookback_days", 0), 5);
        assert_eq!(adapter.get_int("run", "top_n", 2), 2);
        assert_eq!(adapter.get_int("run", "run_date", 42), 42);
    }

    #[test]
    fn get_double_and_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("run", "initial_cash", 0.0), 1000000.5);
        assert_eq!(adapter.get_double("run", "risk_free_rate", 0.01), 0.01);
        assert_eq!(adapter.get_double("run", "tickers", 9.5), 9.5);
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_list("run", "tickers"),
            Some(vec!["AAPL".to_string(), "MSFT".to_string(), "GOOGL".to_string()])
        );
        assert_eq!(adapter.get_list("run", "factors"), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("paths", "price_dir"), Some("data".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/scoretrader.ini");
        match result {
            Err(ScoreTraderError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/scoretrader.ini")
            }
            _ => panic!("expected ConfigParse"),
        }
    }
}
