use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("ran out of space for note sequence ({limit} notes)")]
    NoteCapacity { limit: usize },
    #[error("ran out of space for bar index ({limit} bars)")]
    BarCapacity { limit: usize },
    #[error("cannot open file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write results")]
    Output(#[from] std::io::Error),
    #[error("{0} does not contain a tune")]
    EmptyTemplate(String),
}

pub type MatchResult<T> = Result<T, MatchError>;
