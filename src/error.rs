use std::path::PathBuf;

/// Fatal errors from the export engine. Anything reaching here aborts the run;
/// recoverable situations (missing author record, unsortable history) are
/// logged as warnings instead of being represented here.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("serial counter overflowed its integer range")]
    SerialOverflow,

    #[error("mark counter overflowed its integer range")]
    MarkOverflow,

    #[error("mark requested for serial {0} before it was assigned")]
    MarkNotAssigned(u64),

    #[error("could not create staging directory under {parent}")]
    StagingDirCreate {
        parent: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write staged blob at {path}")]
    StagingBlobWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read staged blob at {path}")]
    StagingBlobRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("write to output stream failed")]
    Output(#[source] std::io::Error),

    #[error("could not open revision-map sink at {path}")]
    RevisionMapOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write to revision-map sink failed")]
    RevisionMapWrite(#[source] std::io::Error),
}
