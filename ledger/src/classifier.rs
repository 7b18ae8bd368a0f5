use greenloop_types::Classification;
use std::future::Future;
use thiserror::Error;

/// A captured camera frame handed to the classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Errors surfaced by the classifier. The scan flow is blocked until the
/// caller retries with a new frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("empty capture frame")]
    EmptyFrame,
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

/// The on-device image classifier.
///
/// Opaque to the ledger: input frame, output ranked labels. A successful
/// classification always carries at least one guess; classification runs
/// locally and never blocks ledger writes.
pub trait Classifier {
    fn classify(
        &self,
        frame: &ImageFrame,
    ) -> impl Future<Output = Result<Classification, ClassifierError>>;
}
