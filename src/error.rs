//! Command Errors
//!
//! Library errors are re-raised under one of these kinds, which decide the
//! process exit status (see `sysexits.h`).

use derive_more::{Display, Error};
use splice_config::error::ErrorKind as ConfigErrorKind;
use splice_overlay::error::ErrorKind as OverlayErrorKind;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("invalid input")]
    InvalidInput,
    #[display("missing input")]
    MissingInput,
    #[display("cannot write output")]
    WriteFailure,
    #[display("{_0} entries failed verification")]
    VerifyFailed(#[error(not(source))] usize),
    #[display("unexpected failure")]
    Unexpected,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Unexpected => 1,
            Self::InvalidInput | Self::VerifyFailed(_) => 65,
            Self::MissingInput => 66,
            Self::WriteFailure => 73,
            Self::Config => 78,
        }
    }
}

impl From<&OverlayErrorKind> for ErrorKind {
    fn from(kind: &OverlayErrorKind) -> Self {
        match kind {
            OverlayErrorKind::CorruptArchive(_)
            | OverlayErrorKind::DuplicateOverrideName(_)
            | OverlayErrorKind::InvalidEntryName(_) => Self::InvalidInput,
            OverlayErrorKind::MissingOverrideSource(_) => Self::MissingInput,
            OverlayErrorKind::WriteFailure(_) => Self::WriteFailure,
            OverlayErrorKind::InvalidPattern(_) => Self::Config,
            OverlayErrorKind::JobAborted(_) | OverlayErrorKind::BatchFailed(_) => Self::Unexpected,
        }
    }
}

impl From<&ConfigErrorKind> for ErrorKind {
    fn from(kind: &ConfigErrorKind) -> Self {
        match kind {
            ConfigErrorKind::NotFound(_) | ConfigErrorKind::Invalid(_) | ConfigErrorKind::UnsupportedFormat(_) => {
                Self::Config
            },
        }
    }
}

/// Re-raise a library error under the command kind matching its cause.
pub trait Classify<T> {
    fn classify(self) -> Result<T>;
}

impl<T> Classify<T> for splice_overlay::error::Result<T> {
    fn classify(self) -> Result<T> {
        self.map_err(|err| {
            let kind = ErrorKind::from(&*err);
            err.raise(kind)
        })
    }
}

impl<T> Classify<T> for splice_config::error::Result<T> {
    fn classify(self) -> Result<T> {
        self.map_err(|err| {
            let kind = ErrorKind::from(&*err);
            err.raise(kind)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;

    #[rstest]
    #[case(OverlayErrorKind::CorruptArchive(PathBuf::from("a.jar")), 65)]
    #[case(OverlayErrorKind::DuplicateOverrideName("a.class".to_string()), 65)]
    #[case(OverlayErrorKind::MissingOverrideSource(PathBuf::from("classes")), 66)]
    #[case(OverlayErrorKind::WriteFailure(PathBuf::from("out.jar")), 73)]
    #[case(OverlayErrorKind::InvalidPattern("[".to_string()), 78)]
    #[case(OverlayErrorKind::BatchFailed(1), 1)]
    fn test_overlay_exit_codes(#[case] kind: OverlayErrorKind, #[case] expected: u8) {
        assert_eq!(ErrorKind::from(&kind).exit_code(), expected);
    }

    #[test]
    fn test_classify_keeps_cause() {
        let result: splice_overlay::error::Result<()> =
            Err(exn::Exn::from(OverlayErrorKind::WriteFailure(PathBuf::from("out.jar"))));
        let err = result.classify().unwrap_err();
        assert_eq!(*err, ErrorKind::WriteFailure);
        assert!(format!("{err:?}").contains("out.jar"));
    }

    #[test]
    fn test_config_is_78() {
        assert_eq!(ErrorKind::from(&ConfigErrorKind::Invalid("jobs".to_string())).exit_code(), 78);
        assert_eq!(ErrorKind::VerifyFailed(2).exit_code(), 65);
    }
}
