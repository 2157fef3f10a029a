//! Typed failures for asset loading.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Shader pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Everything that can abort an asset load.
#[derive(Debug, Error)]
pub enum AssetError {
    /// File missing, unreadable or (for images) undecodable.
    #[error("I/O error loading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed mesh text. `line` is 1-based; `None` when the problem is
    /// the file as a whole.
    #[error(
        "malformed mesh{}: {reason}",
        .line.map(|l| format!(" on line {l}")).unwrap_or_default()
    )]
    Format {
        line: Option<usize>,
        reason: String,
    },

    /// Vertex data can't be packed for the requested attribute set, or
    /// exceeds what 32-bit indices address.
    #[error("vertex layout mismatch: {0}")]
    Layout(String),

    /// A shader stage was rejected by the device compiler.
    /// `diagnostic` is the compiler's own output.
    #[error("{stage} shader failed to compile: {diagnostic}")]
    Compile {
        stage: ShaderStage,
        diagnostic: String,
    },

    /// Allocation, link or other device-side failure.
    #[error("device error: {0}")]
    Device(String),
}

pub type AssetResult<T> = Result<T, AssetError>;

impl AssetError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AssetError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        AssetError::Format {
            line: Some(line),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AssetError::Format {
            line: None,
            reason: reason.into(),
        }
    }

    /// Folds an image decoding failure into [`AssetError::Io`].
    pub fn image(path: impl Into<PathBuf>, err: image::ImageError) -> Self {
        let source = match err {
            image::ImageError::IoError(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        };
        AssetError::io(path, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path() {
        let err = AssetError::io(
            "meshes/tree.obj",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let msg = err.to_string();
        assert!(msg.contains("meshes/tree.obj"), "{msg}");
        assert!(msg.contains("no such file"), "{msg}");
    }

    #[test]
    fn format_error_line_is_optional() {
        assert_eq!(
            AssetError::format(7, "bad index").to_string(),
            "malformed mesh on line 7: bad index"
        );
        assert_eq!(
            AssetError::malformed("no faces").to_string(),
            "malformed mesh: no faces"
        );
    }

    #[test]
    fn compile_error_carries_diagnostic_verbatim() {
        let err = AssetError::Compile {
            stage: ShaderStage::Fragment,
            diagnostic: "line 3: unexpected '}'".into(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: line 3: unexpected '}'"
        );
    }
}
