//! A fixed-size ring buffer.
//! Once full it overwrites its oldest values, which suits the dashboard
//! strips where only the recent past matters.

use num_traits::Float;

/// The size is a const generic so the buffer can live on the stack.
pub struct RingBuffer<T, const SIZE: usize> {
    data: [T; SIZE],
    index: usize,
    filled: bool,
}

impl<T: Default + Copy, const SIZE: usize> RingBuffer<T, SIZE> {
    /// Create a new RingBuffer using T::default().
    pub fn new() -> Self {
        Self {
            data: [T::default(); SIZE],
            index: 0,
            filled: false,
        }
    }
}

impl<T, const SIZE: usize> RingBuffer<T, SIZE> {
    /// Adds a new value to the buffer.
    pub fn push(&mut self, val: T) {
        self.data[self.index] = val;
        let idx = self.index + 1;
        self.index = idx % SIZE;

        if !self.filled && idx == SIZE {
            self.filled = true;
        }
    }

    pub fn len(&self) -> usize {
        if self.filled {
            SIZE
        } else {
            self.index
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the stored values in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (head, tail) = if self.filled {
            (&self.data[self.index..], &self.data[..self.index])
        } else {
            (&self.data[..self.index], &self.data[..0])
        };

        head.iter().chain(tail.iter())
    }

    /// The values that have actually been set, without ordering.
    fn real(&self) -> &[T] {
        if self.filled {
            return &self.data;
        }

        &self.data[..self.index]
    }
}

impl<T: Float, const SIZE: usize> RingBuffer<T, SIZE> {
    /// Min of the stored values, Inf when empty.
    pub fn min(&self) -> T {
        self.real().iter().fold(T::infinity(), |a, &b| a.min(b))
    }

    /// Max of the stored values, -Inf when empty.
    pub fn max(&self) -> T {
        self.real().iter().fold(T::neg_infinity(), |a, &b| a.max(b))
    }

    /// Average of the stored values, zero when empty.
    pub fn avg(&self) -> T {
        let real = self.real();
        if real.is_empty() {
            return T::zero();
        }

        let sum = real.iter().fold(T::zero(), |a, &b| a + b);
        sum / T::from(real.len()).unwrap()
    }
}

impl<T: Default + Copy, const SIZE: usize> Default for RingBuffer<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::RingBuffer;

    #[test]
    fn test_partial_fill() {
        let mut ring = RingBuffer::<f32, 10>::new();
        ring.push(2.0);
        ring.push(4.0);

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2.0, 4.0]);
        assert_eq!(ring.min(), 2.0);
        assert_eq!(ring.max(), 4.0);
        assert_eq!(ring.avg(), 3.0);
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let mut ring = RingBuffer::<f32, 4>::new();
        for i in 0..6 {
            ring.push(i as f32);
        }

        assert_eq!(ring.len(), 4);
        assert_eq!(
            ring.iter().copied().collect::<Vec<_>>(),
            vec![2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn test_empty_stats() {
        let ring = RingBuffer::<f32, 4>::new();
        assert!(ring.is_empty());
        assert_eq!(ring.avg(), 0.0);
    }
}
