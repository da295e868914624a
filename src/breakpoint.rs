use std::collections::BTreeSet;
use std::fmt;

/// Program lines at which a driver should pause, in ascending order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Breakpoints(BTreeSet<usize>);

/// Outcome of a request to set or unset a breakpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakpointChange {
    Set(usize),
    AlreadySet(usize),
    /// Line does not exist in the loaded program.
    OutOfRange(usize),
    Removed(usize),
    NotSet(usize),
}

impl Breakpoints {
    pub fn contains(&self, line: usize) -> bool {
        self.0.contains(&line)
    }

    /// Returns whether the breakpoint was newly added.
    pub fn insert(&mut self, line: usize) -> bool {
        self.0.insert(line)
    }

    /// Returns whether the breakpoint existed.
    pub fn remove(&mut self, line: usize) -> bool {
        self.0.remove(&line)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Drop every breakpoint at or past `program_size`.
    pub fn prune(&mut self, program_size: usize) {
        self.0.retain(|line| *line < program_size);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<usize>> for Breakpoints {
    fn from(vec: Vec<usize>) -> Self {
        Self(vec.into_iter().collect())
    }
}

impl BreakpointChange {
    /// Whether the breakpoint set was modified.
    pub fn changed(&self) -> bool {
        matches!(self, Self::Set(_) | Self::Removed(_))
    }
}

impl fmt::Display for BreakpointChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(line) => write!(f, "Breakpoint set on row {}", line),
            Self::AlreadySet(line) => write!(f, "Breakpoint already set on row {}", line),
            Self::OutOfRange(line) => write!(
                f,
                "Breakpoint not set because line {} doesn't exist in the program",
                line
            ),
            Self::Removed(line) => write!(f, "Breakpoint unset on row {}", line),
            Self::NotSet(line) => write!(
                f,
                "Breakpoint {} not unset because it doesn't exist",
                line
            ),
        }
    }
}
