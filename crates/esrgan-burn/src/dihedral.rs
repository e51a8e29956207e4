//! The eight flips and transposes used for test-time augmentation.
//!
//! Every transform acts on the two spatial dims of an `[N, C, H, W]` tensor.

use burn::prelude::*;

/// Element of the dihedral group of the square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dihedral {
    Identity,
    FlipX,
    FlipY,
    Rotate180,
    Transpose,
    /// Clockwise quarter turn.
    Rotate90,
    Rotate270,
    AntiTranspose,
}

impl Dihedral {
    /// All eight transforms, identity first. Outputs are summed in this order.
    pub const ALL: [Dihedral; 8] = [
        Dihedral::Identity,
        Dihedral::FlipX,
        Dihedral::FlipY,
        Dihedral::Rotate180,
        Dihedral::Transpose,
        Dihedral::Rotate90,
        Dihedral::Rotate270,
        Dihedral::AntiTranspose,
    ];

    /// Whether the transform swaps height and width.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Dihedral::Transpose | Dihedral::Rotate90 | Dihedral::Rotate270 | Dihedral::AntiTranspose
        )
    }

    pub fn inverse(self) -> Dihedral {
        match self {
            Dihedral::Rotate90 => Dihedral::Rotate270,
            Dihedral::Rotate270 => Dihedral::Rotate90,
            other => other,
        }
    }

    pub fn apply<B: Backend>(self, tensor: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Dihedral::Identity => tensor,
            Dihedral::FlipX => tensor.flip([3]),
            Dihedral::FlipY => tensor.flip([2]),
            Dihedral::Rotate180 => tensor.flip([2, 3]),
            Dihedral::Transpose => tensor.swap_dims(2, 3),
            Dihedral::Rotate90 => tensor.swap_dims(2, 3).flip([3]),
            Dihedral::Rotate270 => tensor.swap_dims(2, 3).flip([2]),
            Dihedral::AntiTranspose => tensor.swap_dims(2, 3).flip([2, 3]),
        }
    }
}
