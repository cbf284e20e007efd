// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sequential readers and writers over packed `f64` buffers

use crate::{PackError, Packable, Result};

/// Cursor reading fixed-order fields from a packed buffer
#[derive(Debug, Clone)]
pub struct PackedReader<'a> {
    buffer: &'a [f64],
    offset: usize,
}

impl<'a> PackedReader<'a> {
    /// Create a reader positioned at the start of `buffer`
    pub fn new(buffer: &'a [f64]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Current read offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread values
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    /// Read a single scalar
    pub fn scalar(&mut self) -> Result<f64> {
        let value = *self
            .buffer
            .get(self.offset)
            .ok_or_else(|| PackError::too_short(self.offset, 1, self.remaining()))?;
        self.offset += 1;
        Ok(value)
    }

    /// Read a non-negative integral scalar (counts, offsets, ids)
    pub fn count(&mut self, field: &'static str) -> Result<usize> {
        let value = self.scalar()?;
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return Err(PackError::invalid(field, value));
        }
        Ok(value as usize)
    }

    /// Read a fixed-width packed value
    pub fn read<T: Packable>(&mut self) -> Result<T> {
        let value = T::unpack_from(&self.buffer[self.offset..]).map_err(|err| match err {
            PackError::BufferTooShort {
                needed, available, ..
            } => PackError::too_short(self.offset, needed, available),
            other => other,
        })?;
        self.offset += T::PACKED_LENGTH;
        Ok(value)
    }
}

/// Growable packed buffer written in fixed field order
#[derive(Debug, Clone, Default)]
pub struct PackedWriter {
    buffer: Vec<f64>,
}

impl PackedWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append a single scalar
    pub fn scalar(&mut self, value: f64) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Append a fixed-width packed value
    pub fn write<T: Packable>(&mut self, value: &T) -> &mut Self {
        value.pack_into(&mut self.buffer);
        self
    }

    /// Number of values written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Finish writing and take the buffer
    pub fn finish(self) -> Vec<f64> {
        self.buffer
    }
}
