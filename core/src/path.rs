//! Data paths in dotted/bracketed notation (`a.b[2].c`).

use std::fmt;

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Address of a value inside a validated or parsed document.
///
/// Paths are immutable; [`key`](DataPath::key) and [`index`](DataPath::index)
/// return extended copies, so a caller can hand one path to several
/// children.
///
/// # Examples
///
/// ```
/// use shapecheck_core::DataPath;
///
/// let path = DataPath::root().key("a").key("b").index(2).key("c");
/// assert_eq!(path.to_string(), "a.b[2].c");
/// assert!(DataPath::root().is_root());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPath {
    segments: Vec<Segment>,
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Label used at the start of error messages; the root reads as `this`.
    pub fn label(&self) -> String {
        if self.is_root() {
            "this".to_string()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_index_has_no_dot() {
        let path = DataPath::root().index(0).key("a");
        assert_eq!(path.to_string(), "[0].a");
    }

    #[test]
    fn test_root_label() {
        assert_eq!(DataPath::root().label(), "this");
        assert_eq!(DataPath::root().key("x").label(), "x");
    }
}
