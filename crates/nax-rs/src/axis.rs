//! Named axes and axis selectors.

use std::fmt;
use std::sync::Arc;

/// A named dimension. Two axes denote the same dimension when their names match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Axis {
    name: Arc<str>,
    size: usize,
}

impl Axis {
    pub fn new(name: impl AsRef<str>, size: usize) -> Self {
        Axis {
            name: Arc::from(name.as_ref()),
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns a copy of this axis with a different size.
    pub fn resize(&self, size: usize) -> Axis {
        Axis {
            name: Arc::clone(&self.name),
            size,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.size)
    }
}

/// Either a full [`Axis`] or a bare axis name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AxisSelector {
    Axis(Axis),
    Name(Arc<str>),
}

impl AxisSelector {
    pub fn name(&self) -> &str {
        match self {
            AxisSelector::Axis(axis) => axis.name(),
            AxisSelector::Name(name) => name,
        }
    }

    /// Size carried by the selector, if it names a full axis.
    pub fn size(&self) -> Option<usize> {
        match self {
            AxisSelector::Axis(axis) => Some(axis.size()),
            AxisSelector::Name(_) => None,
        }
    }
}

impl fmt::Display for AxisSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisSelector::Axis(axis) => write!(f, "{axis}"),
            AxisSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<Axis> for AxisSelector {
    fn from(axis: Axis) -> Self {
        AxisSelector::Axis(axis)
    }
}

impl From<&Axis> for AxisSelector {
    fn from(axis: &Axis) -> Self {
        AxisSelector::Axis(axis.clone())
    }
}

impl From<&str> for AxisSelector {
    fn from(name: &str) -> Self {
        AxisSelector::Name(Arc::from(name))
    }
}

impl From<String> for AxisSelector {
    fn from(name: String) -> Self {
        AxisSelector::Name(Arc::from(name))
    }
}

impl From<&AxisSelector> for AxisSelector {
    fn from(selector: &AxisSelector) -> Self {
        selector.clone()
    }
}

/// Returns the name of an axis or selector.
pub fn axis_name(selector: impl Into<AxisSelector>) -> String {
    selector.into().name().to_string()
}

/// Formats an axis list as `(A(2), B(3))` for error messages.
pub(crate) fn format_axes(axes: &[Axis]) -> String {
    let parts: Vec<String> = axes.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}
