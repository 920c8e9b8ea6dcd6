// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

/// A fixed-capacity history with an explicit write cursor.
///
/// Every slot is always initialized, so reading an age that was never written yields the fill
/// value given at construction or the last [`RingBuffer::reset`]. Age 0 is the newest entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RingBuffer<T: Copy, const N: usize> {
    slots: [T; N],
    head: usize,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    pub(crate) fn new(fill: T) -> Self {
        Self {
            slots: [fill; N],
            head: 0,
        }
    }

    /// Overwrites every slot with `fill`.
    pub(crate) fn reset(&mut self, fill: T) {
        self.slots = [fill; N];
        self.head = 0;
    }

    /// Advances the cursor and stores `value` as the newest entry, evicting the oldest.
    pub(crate) fn push(&mut self, value: T) {
        self.head = (self.head + 1) % N;
        self.slots[self.head] = value;
    }

    pub(crate) fn newest_mut(&mut self) -> &mut T {
        &mut self.slots[self.head]
    }

    /// Returns the entry pushed `age` pushes ago.
    pub(crate) fn get(&self, age: usize) -> T {
        debug_assert!(age < N, "age {} exceeds ring capacity {}", age, N);
        self.slots[(self.head + N - age % N) % N]
    }

    /// Iterates over the `count` newest entries, newest first.
    pub(crate) fn recent(&self, count: usize) -> impl Iterator<Item = T> + '_ {
        (0..count.min(N)).map(move |age| self.get(age))
    }
}
