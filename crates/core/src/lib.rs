//! Core shared types and errors (parser- and renderer-agnostic).

pub use glam::{Vec2, Vec3};

use thiserror::Error;

/// What went wrong on a single line of mesh or material text.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ErrorKind {
    #[error("malformed numeric field '{token}' for {field}")]
    MalformedNumericField { field: &'static str, token: String },

    #[error("{channel} index {raw} resolves outside pool of length {len}")]
    IndexOutOfRange {
        channel: &'static str,
        raw: i64,
        len: usize,
    },

    #[error("'{keyword}' used before any newmtl")]
    UndefinedCurrentMaterial { keyword: String },

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid face: {0}")]
    InvalidFace(String),
}

/// A parse failure pinned to its 1-based source line.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ErrorKind) -> Self {
        Self { line, kind }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Problems with flat attribute arrays handed to the tangent generator or finalizer.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("{0} face vertices do not form whole triangles")]
    IncompleteTriangle(usize),

    #[error("triangle index {index} outside {vertices} vertices")]
    TriangleIndexOutOfRange { index: u32, vertices: usize },

    #[error("{channel} holds {found} vertices, position holds {expected}")]
    ChannelMismatch {
        channel: &'static str,
        expected: usize,
        found: usize,
    },
}

pub type GeometryResult<T> = Result<T, GeometryError>;
