//! Per-triangle tangent generation for normal mapping.

use corelib::{GeometryError, GeometryResult, Vec2, Vec3};

/// Tangent used when a triangle's UV mapping has zero area.
pub const FALLBACK_TANGENT: Vec3 = Vec3::X;

/// Compute one tangent per triangle and repeat it for each of the triangle's
/// three vertices. Triangles are read through `indices` when given, otherwise
/// as consecutive position triples. Output is flat and never averaged across
/// shared vertices.
pub fn generate_tangents(
    position: &[f32],
    texcoord: &[f32],
    indices: Option<&[u32]>,
) -> GeometryResult<Vec<f32>> {
    let vertices = position.len() / 3;
    if texcoord.len() / 2 != vertices {
        return Err(GeometryError::ChannelMismatch {
            channel: "texcoord",
            expected: vertices,
            found: texcoord.len() / 2,
        });
    }

    let order: Vec<usize> = match indices {
        Some(indices) => indices
            .iter()
            .map(|&i| {
                let idx = i as usize;
                if idx < vertices {
                    Ok(idx)
                } else {
                    Err(GeometryError::TriangleIndexOutOfRange { index: i, vertices })
                }
            })
            .collect::<GeometryResult<_>>()?,
        None => (0..vertices).collect(),
    };
    if order.len() % 3 != 0 {
        return Err(GeometryError::IncompleteTriangle(order.len()));
    }

    let point = |i: usize| Vec3::from_slice(&position[i * 3..i * 3 + 3]);
    let uv = |i: usize| Vec2::from_slice(&texcoord[i * 2..i * 2 + 2]);

    let mut tangents = Vec::with_capacity(order.len() * 3);
    for tri in order.chunks_exact(3) {
        let t = triangle_tangent(
            [point(tri[0]), point(tri[1]), point(tri[2])],
            [uv(tri[0]), uv(tri[1]), uv(tri[2])],
        );
        for _ in 0..3 {
            tangents.extend_from_slice(&t.to_array());
        }
    }
    Ok(tangents)
}

/// Direction of increasing U across the triangle, or [`FALLBACK_TANGENT`]
/// when the UV determinant's inverse is not finite.
pub fn triangle_tangent(p: [Vec3; 3], uv: [Vec2; 3]) -> Vec3 {
    let dp12 = p[1] - p[0];
    let dp13 = p[2] - p[0];
    let duv12 = uv[1] - uv[0];
    let duv13 = uv[2] - uv[0];

    let f = 1.0 / (duv12.x * duv13.y - duv13.x * duv12.y);
    if !f.is_finite() {
        return FALLBACK_TANGENT;
    }
    ((dp12 * duv13.y - dp13 * duv12.y) * f).normalize_or_zero()
}
