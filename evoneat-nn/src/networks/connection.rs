use std::fmt;

/// An incoming link of a network node.
#[derive(Clone, Copy, PartialEq)]
pub struct Connection {
    pub input: usize,
    pub weight: f32,
}

impl Connection {
    /// Creates a new Connection with the specified
    /// input node and weight.
    pub fn new(input: usize, weight: f32) -> Connection {
        Connection { input, weight }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.9}", self.input, self.weight)
    }
}
