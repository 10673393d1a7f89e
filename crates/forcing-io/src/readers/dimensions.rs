//! Mapping of file axes onto the canonical `{time, x, y, patch, layer}`
//! layout and flattening to `[time, point]`.
//!
//! Axis discovery happens once per variable: every declared axis is bound to
//! a role in file order. Extraction then slices the requested indices,
//! appends size-1 axes for absent roles and transposes once.

use std::fmt;

use ndarray::{Array2, Array5, ArrayD, Axis, Ix5};

use crate::error::{ForcingError, Result};
use crate::field::canonicalize_missing;
use crate::geometry::GeometryModel;
use crate::variable::pair_slots;

/// Canonical role of a file axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    Time,
    X,
    Y,
    Patch,
    Layer,
}

impl AxisRole {
    /// Canonical axis order.
    pub const CANONICAL: [AxisRole; 5] = [
        AxisRole::Time,
        AxisRole::X,
        AxisRole::Y,
        AxisRole::Patch,
        AxisRole::Layer,
    ];

    /// Role of a dimension name, if recognised.
    pub fn classify(name: &str) -> Option<Self> {
        match name {
            "time" => Some(AxisRole::Time),
            "Number_of_points" | "xx" | "lon" | "x" => Some(AxisRole::X),
            "yy" | "lat" | "y" => Some(AxisRole::Y),
            "Number_of_Tile" | "Number_of_Patches" | "patch" => Some(AxisRole::Patch),
            "Number_of_Layers" | "layer" => Some(AxisRole::Layer),
            _ => None,
        }
    }

    fn position(&self) -> usize {
        match self {
            AxisRole::Time => 0,
            AxisRole::X => 1,
            AxisRole::Y => 2,
            AxisRole::Patch => 3,
            AxisRole::Layer => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisRole::Time => "time",
            AxisRole::X => "x",
            AxisRole::Y => "y",
            AxisRole::Patch => "patch",
            AxisRole::Layer => "layer",
        }
    }
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file axis and its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisBinding {
    pub role: AxisRole,
    pub name: String,
    pub len: usize,
}

/// Indices to keep along the selectable axes. `None`/empty keeps all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSelection {
    pub times: Option<Vec<usize>>,
    pub patches: Vec<usize>,
    pub layers: Vec<usize>,
}

/// Axis bindings of one variable, in file order.
#[derive(Debug, Clone)]
pub struct DimensionMapper {
    variable: String,
    bindings: Vec<AxisBinding>,
}

impl DimensionMapper {
    /// Bind every `(name, length)` axis to a role.
    pub fn new(variable: &str, axes: &[(String, usize)]) -> Result<Self> {
        let mut bindings: Vec<AxisBinding> = Vec::with_capacity(axes.len());
        for (name, len) in axes {
            let role = AxisRole::classify(name)
                .ok_or_else(|| ForcingError::unsupported_axis(variable, name.as_str()))?;
            if bindings.iter().any(|b| b.role == role) {
                return Err(ForcingError::unsupported_axis(
                    variable,
                    format!("{} (second {} axis)", name, role),
                ));
            }
            bindings.push(AxisBinding {
                role,
                name: name.clone(),
                len: *len,
            });
        }
        Ok(Self {
            variable: variable.to_string(),
            bindings,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn bindings(&self) -> &[AxisBinding] {
        &self.bindings
    }

    pub fn binding(&self, role: AxisRole) -> Option<&AxisBinding> {
        self.bindings.iter().find(|b| b.role == role)
    }

    pub fn has(&self, role: AxisRole) -> bool {
        self.binding(role).is_some()
    }

    fn indices_for<'a>(role: AxisRole, selection: &'a AxisSelection) -> Option<&'a [usize]> {
        match role {
            AxisRole::Time => selection.times.as_deref(),
            AxisRole::Patch if !selection.patches.is_empty() => Some(&selection.patches),
            AxisRole::Layer if !selection.layers.is_empty() => Some(&selection.layers),
            _ => None,
        }
    }

    fn check_indices(role: AxisRole, indices: &[usize], len: usize) -> Result<()> {
        match indices.iter().find(|&&i| i >= len) {
            Some(&index) => Err(ForcingError::InvalidSelection {
                axis: role.as_str(),
                index,
                len,
            }),
            None => Ok(()),
        }
    }

    /// Slice, pad and transpose `data` (shaped as the file axes) to
    /// `[time, x, y, patch, layer]`.
    pub fn canonicalize(&self, data: ArrayD<f64>, selection: &AxisSelection) -> Result<Array5<f64>> {
        let shape: Vec<usize> = self.bindings.iter().map(|b| b.len).collect();
        if data.shape() != shape.as_slice() {
            return Err(ForcingError::invalid_format(format!(
                "{}: data shape {:?} does not match axes {:?}",
                self.variable,
                data.shape(),
                shape
            )));
        }

        let mut data = data;
        let mut positions: [Option<usize>; 5] = [None; 5];
        for (axis, binding) in self.bindings.iter().enumerate() {
            if let Some(indices) = Self::indices_for(binding.role, selection) {
                Self::check_indices(binding.role, indices, binding.len)?;
                data = data.select(Axis(axis), indices);
            }
            positions[binding.role.position()] = Some(axis);
        }

        for role in AxisRole::CANONICAL {
            if positions[role.position()].is_none() {
                // A missing axis behaves as length 1
                if let Some(indices) = Self::indices_for(role, selection) {
                    if role != AxisRole::Time {
                        Self::check_indices(role, indices, 1)?;
                    }
                }
                let axis = data.ndim();
                data = data.insert_axis(Axis(axis));
                positions[role.position()] = Some(axis);
            }
        }

        let order: Vec<usize> = positions.iter().flatten().copied().collect();
        data.permuted_axes(order.as_slice())
            .into_dimensionality::<Ix5>()
            .map_err(|e| ForcingError::invalid_format(format!("{}: {}", self.variable, e)))
    }

    /// Flatten a canonical array to `[time, npoints * nsub]`.
    ///
    /// Sub-point slots are the outer blocks of the point axis; patches and
    /// layers both requested are paired slot by slot (see [`pair_slots`]).
    /// Without a mask, points run y-major over `(x, y)`; with a mask, point
    /// `k` is the x-major grid index `mask[k]`. Two-dimensional files must
    /// match the grid extents axis by axis.
    pub fn flatten(
        canonical: &Array5<f64>,
        geometry: &GeometryModel,
        selection: &AxisSelection,
    ) -> Result<Array2<f64>> {
        let (nt, nx, ny, np, nl) = canonical.dim();
        let paired = !selection.patches.is_empty() && !selection.layers.is_empty();
        let slots = pair_slots(np, nl, paired)?;
        let nsub = slots.len();
        let npoints = geometry.npoints();

        let expected_cells = match geometry.mask() {
            Some(_) => geometry.grid_size(),
            None => npoints,
        };
        if nx * ny != expected_cells {
            return Err(ForcingError::PointCountMismatch {
                got: nx * ny * nsub,
                expected: expected_cells * nsub,
            });
        }
        if ny > 1 && (nx, ny) != (geometry.nlons(), geometry.nlats()) {
            return Err(ForcingError::GeometryMismatch(format!(
                "{} x {} values on a {} x {} grid",
                nx,
                ny,
                geometry.nlons(),
                geometry.nlats()
            )));
        }

        let cells: Vec<(usize, usize)> = match geometry.mask() {
            Some(mask) => mask.iter().map(|&g| (g / ny, g % ny)).collect(),
            None => (0..npoints).map(|k| (k % nx, k / nx)).collect(),
        };

        let mut out = Array2::<f64>::zeros((nt, npoints * nsub));
        for t in 0..nt {
            for (s, &(p, l)) in slots.iter().enumerate() {
                let offset = s * npoints;
                for (k, &(x, y)) in cells.iter().enumerate() {
                    out[[t, offset + k]] = canonicalize_missing(canonical[[t, x, y, p, l]]);
                }
            }
        }
        Ok(out)
    }
}
