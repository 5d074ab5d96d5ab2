//! Domain error types.

use std::path::PathBuf;

/// Top-level error type for scoretrader.
#[derive(Debug, thiserror::Error)]
pub enum ScoreTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("required input file not found: {}", path.display())]
    MissingInput { path: PathBuf },

    #[error("malformed input {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("insufficient data: {what} (have {have}, need {need})")]
    InsufficientData {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("factor {factor} has zero cross-sectional variance")]
    DegenerateFactor { factor: String },

    #[error("basket rejected, unusable tickers: {}", tickers.join(", "))]
    BasketRejected { tickers: Vec<String> },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoreTraderError {
    pub fn insufficient(what: impl Into<String>, have: usize, need: usize) -> Self {
        ScoreTraderError::InsufficientData {
            what: what.into(),
            have,
            need,
        }
    }
}

impl From<&ScoreTraderError> for std::process::ExitCode {
    fn from(err: &ScoreTraderError) -> Self {
        let code: u8 = match err {
            ScoreTraderError::Io(_) => 1,
            ScoreTraderError::ConfigParse { .. }
            | ScoreTraderError::ConfigMissing { .. }
            | ScoreTraderError::ConfigInvalid { .. } => 2,
            ScoreTraderError::MissingInput { .. }
            | ScoreTraderError::MalformedInput { .. }
            | ScoreTraderError::Csv(_) => 3,
            ScoreTraderError::DegenerateFactor { .. } => 4,
            ScoreTraderError::InsufficientData { .. } | ScoreTraderError::BasketRejected { .. } => {
                5
            }
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_names_path() {
        let err = ScoreTraderError::MissingInput {
            path: PathBuf::from("docs/factor_scores_2025-07-11.csv"),
        };
        assert_eq!(
            err.to_string(),
            "required input file not found: docs/factor_scores_2025-07-11.csv"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = ScoreTraderError::insufficient("tickers to z-score for pe", 1, 2);
        assert_eq!(
            err.to_string(),
            "insufficient data: tickers to z-score for pe (have 1, need 2)"
        );
    }

    #[test]
    fn basket_rejected_lists_tickers() {
        let err = ScoreTraderError::BasketRejected {
            tickers: vec!["AAPL".into(), "META".into()],
        };
        assert_eq!(err.to_string(), "basket rejected, unusable tickers: AAPL, META");
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let cases = [
            (
                ScoreTraderError::ConfigMissing {
                    section: "run".into(),
                    key: "run_date".into(),
                },
                ExitCode::from(2),
            ),
            (
                ScoreTraderError::MissingInput {
                    path: PathBuf::from("x.csv"),
                },
                ExitCode::from(3),
            ),
            (
                ScoreTraderError::DegenerateFactor {
                    factor: "pe".into(),
                },
                ExitCode::from(4),
            ),
            (
                ScoreTraderError::insufficient("tickers", 0, 1),
                ExitCode::from(5),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(&err)),
                format!("{:?}", expected)
            );
        }
    }
}
