//! Contract errors raised while streaming or binding uniform data.
//!
//! Allocation and startup failures go through `anyhow` instead; these enums
//! cover the cases a caller may want to match on.

use std::fmt;

use crate::data_structures::entity::View;

/// A write into a [`StreamingBuffer`](crate::buffer::StreamingBuffer) was rejected.
///
/// A failed push leaves the buffer's head where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Alignment was zero or not a power of two.
    InvalidAlignment(u64),
    /// The write would end past the end of the buffer.
    CapacityExceeded {
        head: u64,
        requested: u64,
        capacity: u64,
    },
    /// More lights than the global block can describe.
    TooManyLights { count: usize, max: usize },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::InvalidAlignment(alignment) => {
                write!(f, "alignment {alignment} is not a power of two")
            }
            StreamError::CapacityExceeded {
                head,
                requested,
                capacity,
            } => write!(
                f,
                "writing {requested} bytes at head {head} exceeds the buffer capacity \
                 of {capacity} bytes"
            ),
            StreamError::TooManyLights { count, max } => {
                write!(f, "{count} lights do not fit the global block (max {max})")
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// A block range could not be bound for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    /// The frame was written without the view this pass reads.
    ViewNotWritten(View),
    /// The entity has no block recorded for the view this pass reads.
    MissingBlock { entity: usize },
    /// The offset does not fit a dynamic offset or breaks the device alignment.
    MisalignedOffset { offset: u64, alignment: u64 },
    /// The block was recorded with a size the bind group was not created for.
    SizeMismatch { expected: u64, actual: u64 },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::ViewNotWritten(view) => {
                write!(f, "no blocks were written for the {view:?} view this frame")
            }
            BindError::MissingBlock { entity } => {
                write!(f, "entity {entity} has no block recorded for this frame")
            }
            BindError::MisalignedOffset { offset, alignment } => {
                write!(f, "offset {offset} cannot be bound with alignment {alignment}")
            }
            BindError::SizeMismatch { expected, actual } => {
                write!(f, "block of {actual} bytes bound where {expected} bytes were expected")
            }
        }
    }
}

impl std::error::Error for BindError {}
