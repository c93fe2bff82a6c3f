//! Refcounted, copy-on-write buffer windows (spec.md §3 "Buffer", §4.1).
//!
//! A [`Window`] is a `(buffer, offset, length)` view over a contiguous,
//! reference-counted backing store, generic over the element type so the
//! same growth/COW machinery backs both [`crate::string::CatString`]
//! (`Window<u8>`) and [`crate::list::CatList`] (`Window<Value>`).
//!
//! Per spec.md §9's design note, this is implemented the idiomatic-Rust
//! way recommended there: an `Arc`-like handle rather than a hand-rolled
//! atomic refcount. `Arc::strong_count` *is* the buffer's refcount (it is
//! already atomic, satisfying spec.md §5's requirement), and
//! `Arc::get_mut` *is* the "observe refcount == 1" check that gates every
//! mutation — the borrow checker then makes it impossible to mutate a
//! shared buffer by accident, which a hand-rolled refcount could not give
//! us for free.

use std::sync::Arc;

/// Minimum number of elements a growth reallocation adds to the growing
/// side, even if `n` is smaller. Keeps small, repeated appends (the
/// "exponential grow" scenario in spec.md §8) from reallocating on every
/// call.
const MIN_GROWTH: usize = 8;

/// The growth factor applied each time a reservation doesn't yet fit.
const GROWTH_FACTOR: f64 = 1.5;

/// Backing storage for a [`Window`]. Always fully initialized (unused
/// slack is filled with `T::default()`) so no unsafe code is needed to
/// manage partially-initialized memory.
struct RawStore<T> {
    data: Vec<T>,
}

/// A `(buffer, offset, length)` view, as described in spec.md's GLOSSARY.
///
/// Cloning a `Window` is `O(1)`: it only bumps the backing store's
/// refcount (spec.md §3 invariant: "clone increments refcounts for
/// heap-bearing variants, never deep-copies").
pub struct Window<T> {
    buf: Arc<RawStore<T>>,
    off: usize,
    len: usize,
}

impl<T: Clone + Default> Window<T> {
    /// An empty window over a freshly allocated, unshared buffer.
    pub fn new() -> Self {
        Window { buf: Arc::new(RawStore { data: Vec::new() }), off: 0, len: 0 }
    }

    /// A window over a buffer holding exactly `content`, with no slack.
    pub fn from_vec(content: Vec<T>) -> Self {
        let len = content.len();
        Window { buf: Arc::new(RawStore { data: content }), off: 0, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity of the backing buffer (spec.md §3 "Buffer" `size`).
    pub fn capacity(&self) -> usize {
        self.buf.data.len()
    }

    /// The buffer's current refcount (spec.md §3 "Buffer" `refcount`).
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.buf)
    }

    fn is_unique(&self) -> bool {
        Arc::strong_count(&self.buf) == 1
    }

    /// Read-only view of this window's content.
    pub fn as_slice(&self) -> &[T] {
        &self.buf.data[self.off..self.off + self.len]
    }

    /// A new window sharing the same buffer, covering `[off, off+len)` of
    /// *this* window (spec.md §4.1 `substring_view`).
    pub fn substring_view(&self, off: usize, len: usize) -> Self {
        assert!(off + len <= self.len, "substring_view out of bounds");
        Window { buf: Arc::clone(&self.buf), off: self.off + off, len }
    }

    /// Split this window into two windows sharing the same buffer, with no
    /// data copy (spec.md §4.2 `splitn`).
    pub fn split_at(&self, at: usize) -> (Self, Self) {
        assert!(at <= self.len, "split_at out of bounds");
        (self.substring_view(0, at), self.substring_view(at, self.len - at))
    }

    /// Drop all content and reset to empty, keeping the (now unshared)
    /// allocation if uniquely owned, or releasing it otherwise.
    pub fn clear(&mut self) {
        if self.is_unique() {
            let store = Arc::get_mut(&mut self.buf).expect("checked unique");
            store.data.clear();
        } else {
            self.buf = Arc::new(RawStore { data: Vec::new() });
        }
        self.off = 0;
        self.len = 0;
    }

    /// Reserve room for `n` more elements on the right, per the
    /// algorithm in spec.md §4.1.
    pub fn reserve_right(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let cap = self.capacity();
        if !self.is_unique() || cap - self.len < n {
            self.grow_right(n);
        } else if cap - self.off - self.len >= n {
            // already room
        } else {
            let new_off = cap - self.len - n;
            self.slide_to(new_off);
        }
    }

    /// Symmetric to [`Window::reserve_right`].
    pub fn reserve_left(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let cap = self.capacity();
        if !self.is_unique() || cap - self.len < n {
            self.grow_left(n);
        } else if self.off >= n {
            // already room
        } else {
            let new_off = n;
            self.slide_to(new_off);
        }
    }

    fn grown_space(mut space: usize, n: usize) -> usize {
        space = space.max(MIN_GROWTH);
        while space < n {
            space = ((space as f64) * GROWTH_FACTOR).ceil() as usize;
        }
        space
    }

    fn grow_right(&mut self, n: usize) {
        let cap = self.capacity();
        let lspace = self.off;
        let rspace = Self::grown_space(cap.saturating_sub(self.off + self.len), n);
        let new_cap = lspace + self.len + rspace;
        self.reallocate(new_cap, lspace);
    }

    fn grow_left(&mut self, n: usize) {
        let cap = self.capacity();
        let rspace = cap - self.off - self.len;
        let lspace = Self::grown_space(self.off, n);
        let new_cap = lspace + self.len + rspace;
        self.reallocate(new_cap, lspace);
    }

    /// Allocate a fresh, uniquely-owned buffer of `new_cap` elements and
    /// copy this window's content to start at `new_off` within it.
    fn reallocate(&mut self, new_cap: usize, new_off: usize) {
        let mut data = Vec::with_capacity(new_cap);
        data.resize_with(new_off, T::default);
        data.extend_from_slice(self.as_slice());
        data.resize_with(new_cap, T::default);
        self.buf = Arc::new(RawStore { data });
        self.off = new_off;
    }

    /// Move this window's content within its (uniquely-owned) buffer to
    /// start at `new_off`, via elementwise swaps (correct for overlapping
    /// ranges, and doesn't require `T: Copy`).
    fn slide_to(&mut self, new_off: usize) {
        if new_off == self.off {
            return;
        }
        let old_off = self.off;
        let len = self.len;
        let store = Arc::get_mut(&mut self.buf).expect("slide_to requires a unique buffer");
        if new_off < old_off {
            for i in 0..len {
                store.data.swap(old_off + i, new_off + i);
            }
        } else {
            for i in (0..len).rev() {
                store.data.swap(old_off + i, new_off + i);
            }
        }
        self.off = new_off;
    }

    /// Reserve `n` elements on the right and return a mutable slice over
    /// them, extending this window's length.
    pub fn extend_right(&mut self, n: usize) -> &mut [T] {
        self.reserve_right(n);
        let start = self.off + self.len;
        self.len += n;
        let store = Arc::get_mut(&mut self.buf).expect("reserve_right leaves buffer unique");
        &mut store.data[start..start + n]
    }

    /// Reserve `n` elements on the left and return a mutable slice over
    /// them, extending this window's length (and shifting its offset).
    pub fn extend_left(&mut self, n: usize) -> &mut [T] {
        self.reserve_left(n);
        self.off -= n;
        self.len += n;
        let store = Arc::get_mut(&mut self.buf).expect("reserve_left leaves buffer unique");
        &mut store.data[self.off..self.off + n]
    }

    /// Append `other`'s content to the right of this window.
    pub fn extend_right_from_slice(&mut self, other: &[T]) {
        self.extend_right(other.len()).clone_from_slice(other);
    }

    /// Shrink this window to `new_len` elements, dropping the discarded
    /// tail elements immediately if this window uniquely owns the buffer
    /// (spec.md §3 "Lists of Values destroy their elements before
    /// releasing the Buffer").
    pub fn truncate_right(&mut self, new_len: usize) {
        assert!(new_len <= self.len);
        if self.is_unique() {
            let store = Arc::get_mut(&mut self.buf).expect("checked unique");
            for slot in &mut store.data[self.off + new_len..self.off + self.len] {
                *slot = T::default();
            }
        }
        self.len = new_len;
    }

    /// Drop `n` elements from the left, shifting the window's offset.
    pub fn truncate_left(&mut self, n: usize) {
        assert!(n <= self.len);
        if self.is_unique() {
            let store = Arc::get_mut(&mut self.buf).expect("checked unique");
            for slot in &mut store.data[self.off..self.off + n] {
                *slot = T::default();
            }
        }
        self.off += n;
        self.len -= n;
    }
}

impl<T: Clone + Default> Default for Window<T> {
    fn default() -> Self {
        Window::new()
    }
}

impl<T: Clone + Default> Clone for Window<T> {
    /// `O(1)`: shares the buffer and bumps its refcount.
    fn clone(&self) -> Self {
        Window { buf: Arc::clone(&self.buf), off: self.off, len: self.len }
    }
}

impl<T: PartialEq + Clone + Default> PartialEq for Window<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: std::fmt::Debug + Clone + Default> std::fmt::Debug for Window<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("off", &self.off)
            .field("len", &self.len)
            .field("cap", &self.capacity())
            .field("content", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_shallow_and_bumps_refcount() {
        let w = Window::from_vec(vec![1u8, 2, 3]);
        assert_eq!(w.refcount(), 1);
        let w2 = w.clone();
        assert_eq!(w.refcount(), 2);
        assert_eq!(w2.refcount(), 2);
        assert_eq!(w.as_slice(), w2.as_slice());
    }

    #[test]
    fn exponential_grow_scenario() {
        // spec.md §8 scenario 1
        let mut w: Window<u8> = Window::new();
        for _ in 0..4 {
            w.extend_right_from_slice(b"abcd");
        }
        assert_eq!(w.as_slice(), b"abcdabcdabcdabcd");
        assert!(w.capacity() >= 16);
    }

    #[test]
    fn copy_on_write_scenario() {
        // spec.md §8 scenario 2
        let mut s1 = Window::from_vec(b"hello".to_vec());
        let s2 = s1.clone();
        assert_eq!(s1.refcount(), 2);

        s1.extend_right_from_slice(b"!");

        assert_eq!(s1.as_slice(), b"hello!");
        assert_eq!(s2.as_slice(), b"hello");
        assert_eq!(s1.refcount(), 1);
        assert_eq!(s2.refcount(), 1);
    }

    #[test]
    fn reserve_right_reuses_capacity_without_reallocating() {
        let mut w: Window<u8> = Window::new();
        w.extend_right_from_slice(b"ab");
        let cap_before = w.capacity();
        // still room from the initial over-allocation
        w.reserve_right(1);
        assert_eq!(w.capacity(), cap_before);
    }

    #[test]
    fn reserve_left_slides_when_room_exists_on_the_wrong_side() {
        let mut w: Window<u8> = Window::new();
        w.extend_right_from_slice(b"hello world, this is a longer string");
        // carve off a right-hand substring so there's free space on the left
        w.truncate_left(20);
        let cap = w.capacity();
        let left_free_before = {
            // private field access isn't available; infer indirectly via reserve behaviour
            cap
        };
        let _ = left_free_before;
        w.extend_left(1);
        assert_eq!(w.capacity(), cap, "slide should not need to reallocate");
    }

    #[test]
    fn substring_view_shares_buffer() {
        let w = Window::from_vec(b"hello world".to_vec());
        let sub = w.substring_view(6, 5);
        assert_eq!(sub.as_slice(), b"world");
        assert_eq!(w.refcount(), 2);
    }

    #[test]
    fn split_at_shares_buffer_no_copy() {
        let w = Window::from_vec(vec![1, 2, 3, 4, 5]);
        let (a, b) = w.split_at(2);
        assert_eq!(a.as_slice(), &[1, 2]);
        assert_eq!(b.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn truncate_right_drops_discarded_elements_when_unique() {
        use std::rc::Rc;
        #[derive(Clone, Default)]
        struct Counted(Option<Rc<()>>);

        let sentinel = Rc::new(());
        let mut w: Window<Counted> = Window::from_vec(vec![
            Counted(Some(sentinel.clone())),
            Counted(Some(sentinel.clone())),
        ]);
        assert_eq!(Rc::strong_count(&sentinel), 3);
        w.truncate_right(1);
        assert_eq!(Rc::strong_count(&sentinel), 2);
    }

    #[test]
    fn concat_law_holds_across_window_operations() {
        let mut w: Window<u8> = Window::new();
        w.extend_right_from_slice(b"foo");
        w.extend_left(3);
        w.as_slice(); // silence unused warnings on some toolchains
        let store_now: Vec<u8> = {
            let s = w.as_slice().to_vec();
            s
        };
        // extend_left reserved uninitialized (default) bytes; fill them to
        // verify the right-hand "foo" wasn't disturbed by the left growth.
        assert_eq!(&store_now[3..], b"foo");
    }
}
