//! Ordered buckets that hold a phase's hooks until the chain drains them.
//!
//! Two insertion policies exist:
//! 1. [`Queue`] appends, so iteration is oldest first.
//! 2. [`Stack`] prepends, so the most recently inserted item runs first. The
//!    `initially` phase uses it so later registrations can jump ahead of
//!    setup steps that were added earlier.
//!
//! Both remove from the back; buckets are consumed by [`HookBucket::drain`],
//! not by repeated `remove` calls.

use std::collections::vec_deque::{self, VecDeque};

/// Insert/remove container with a fixed insertion policy.
pub trait HookBucket<T> {
    /// Add an item according to the bucket's policy.
    fn insert(&mut self, item: T);

    /// Add an item at the end, whatever the policy.
    fn append(&mut self, item: T);

    /// Remove and return the last item, or `None` when empty.
    fn remove(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in iteration order.
    fn iter(&self) -> vec_deque::Iter<'_, T>;

    /// Remove every item, yielding them in iteration order.
    fn drain(&mut self) -> vec_deque::Drain<'_, T>;
}

macro_rules! bucket_type {
    ($(#[$meta:meta])* $name:ident, $insert:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name<T> {
            items: VecDeque<T>,
        }

        impl<T> $name<T> {
            pub fn new() -> Self {
                Self { items: VecDeque::new() }
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> HookBucket<T> for $name<T> {
            fn insert(&mut self, item: T) {
                self.items.$insert(item);
            }

            fn append(&mut self, item: T) {
                self.items.push_back(item);
            }

            fn remove(&mut self) -> Option<T> {
                self.items.pop_back()
            }

            fn len(&self) -> usize {
                self.items.len()
            }

            fn iter(&self) -> vec_deque::Iter<'_, T> {
                self.items.iter()
            }

            fn drain(&mut self) -> vec_deque::Drain<'_, T> {
                self.items.drain(..)
            }
        }

        impl<T> FromIterator<T> for $name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                let mut bucket = Self::new();
                for item in iter {
                    bucket.insert(item);
                }
                bucket
            }
        }
    };
}

bucket_type!(
    /// FIFO bucket: `insert` appends.
    Queue,
    push_back
);

bucket_type!(
    /// Insert-at-front bucket: `insert` prepends.
    Stack,
    push_front
);
