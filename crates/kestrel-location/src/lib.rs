//! Source positions and node identities. [Byte] and [ByteRange] are absolute offsets into the
//! raw source, [Point] and [Range] are their line/column counterparts used when rendering
//! diagnostics. Every syntax node is a [Located] value that also carries a [NodeId], the key the
//! checker uses to attach its results to the tree.

use core::fmt;
use std::cell::Cell;
use std::fmt::Display;

/// Byte position in a source file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Byte(pub usize);

impl Byte {
    /// Finds the line and column of this offset inside `code`. Offsets past the end of the
    /// source collapse to the origin.
    pub fn locate(&self, code: &str) -> Point {
        let mut acc = 0;
        for (line, code_line) in code.lines().enumerate() {
            if acc + code_line.len() + 1 > self.0 {
                return Point {
                    line,
                    column: self.0 - acc,
                };
            }
            acc += code_line.len() + 1;
        }
        Point::default()
    }
}

/// Two byte positions inside a source file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ByteRange(pub Byte, pub Byte);

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self(Byte(start), Byte(end))
    }

    pub fn locate(&self, code: &str) -> Range {
        Range(self.0.locate(code), self.1.locate(code))
    }
}

/// Line and column position inside a source file.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Point {
    pub line: usize,
    pub column: usize,
}

/// Two line and column positions ([Point]s) inside a source file.
#[derive(Debug, PartialEq, Eq)]
pub struct Range(pub Point, pub Point);

impl Range {
    pub fn new(start: usize, end: usize, code: &str) -> Self {
        Self(Byte(start).locate(code), Byte(end).locate(code))
    }

    pub fn singleton(byte: usize, code: &str) -> Self {
        let point = Byte(byte).locate(code);
        Self(point, point)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 != self.1 {
            write!(f, "{}~{}", self.0, self.1)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Stable identity of a syntax node. Two nodes of the same tree never share an id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints [NodeId]s for one tree. Whoever builds the tree (a parser, a test) owns one of these.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: Cell<usize>,
}

impl NodeIds {
    pub fn fresh(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }

    /// Wraps `data` into a new node with a fresh id.
    pub fn located<T>(&self, location: ByteRange, data: T) -> Located<T> {
        Located {
            id: self.fresh(),
            location,
            data,
        }
    }
}

#[derive(Debug)]
pub struct Located<T> {
    pub id: NodeId,
    pub location: ByteRange,
    pub data: T,
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl<T> Located<T> {
    pub fn new(id: NodeId, location: ByteRange, data: T) -> Self {
        Self { id, location, data }
    }

    pub fn map<R>(self, f: impl Fn(T) -> R) -> Located<R> {
        Located {
            id: self.id,
            location: self.location,
            data: f(self.data),
        }
    }
}
