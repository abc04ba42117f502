use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferOp {
    Download,
    Upload,
    Copy,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransferOp::Download => "download",
            TransferOp::Upload => "upload",
            TransferOp::Copy => "copy",
        };
        f.write_str(label)
    }
}

/// Failures a flow knows how to report. Anything else travels as
/// `Unhandled` up to the top-level handler.
#[derive(Debug, Error)]
pub(crate) enum RemoteFileError {
    #[error("Failed to connect to {host}: {reason}")]
    Connection { host: String, reason: String },
    #[error("Failed to {op} {path}")]
    Transfer { op: TransferOp, path: String },
    #[error("Failed to upload {path}, SSH master process died")]
    ConnectionLost { path: String },
    #[error("No remote file path was given")]
    MissingPath,
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl RemoteFileError {
    pub(crate) fn transfer(op: TransferOp, path: &str) -> Self {
        RemoteFileError::Transfer {
            op,
            path: path.to_string(),
        }
    }
}
