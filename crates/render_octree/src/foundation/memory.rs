//! Memory management utilities
//!
//! Per-frame buffers are rented and returned instead of allocated, so the
//! steady state of the batching pipeline performs no heap allocation.

/// Pool of reusable `Vec` buffers
///
/// A rented buffer is always empty but keeps whatever capacity it grew to
/// during earlier frames.
pub struct VecPool<T> {
    free: Vec<Vec<T>>,
    initial_capacity: usize,
    rented: usize,
}

impl<T> VecPool<T> {
    /// Create a new pool whose fresh buffers start at `initial_capacity`
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            initial_capacity,
            rented: 0,
        }
    }
    
    /// Rent an empty buffer able to hold at least `min_capacity` elements
    pub fn rent(&mut self, min_capacity: usize) -> Vec<T> {
        self.rented += 1;
        match self.free.pop() {
            Some(mut buffer) => {
                buffer.reserve(min_capacity);
                buffer
            }
            None => Vec::with_capacity(min_capacity.max(self.initial_capacity)),
        }
    }
    
    /// Return a buffer to the pool; its contents are dropped, its capacity kept
    pub fn give_back(&mut self, mut buffer: Vec<T>) {
        buffer.clear();
        self.rented = self.rented.saturating_sub(1);
        self.free.push(buffer);
    }
    
    /// Number of buffers currently rented out
    pub fn rented_count(&self) -> usize {
        self.rented
    }
    
    /// Number of idle buffers waiting in the pool
    pub fn available_count(&self) -> usize {
        self.free.len()
    }
}

impl<T> Default for VecPool<T> {
    fn default() -> Self {
        Self::new(0)
    }
}
