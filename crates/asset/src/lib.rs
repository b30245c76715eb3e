//! Asset parsers: OBJ meshes, MTL material libraries and the vertex
//! attribute streams (tangents included) derived from them.

pub mod finalize;
pub mod mesh;
pub mod model;
pub mod mtl;
pub mod obj;
pub mod pool;
pub mod tangent;
pub mod text;

pub use text::{Diagnostic, NumberMode, ParseOptions};
