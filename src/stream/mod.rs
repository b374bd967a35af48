// Event classification and keyed stream building
//
// Phase one of a pass: every decoded record is classified against the
// acceptance policy of its category and, when accepted, appended to the
// bucket of its key. Buckets are created on first sight of a key and are
// owned by the builder; no key's bucket is visible to another key.
//
// Keys are (group, id): the group is the hart for kernel traps and the
// process for everything else, the id is the trap cause, syscall number
// or serial call number carried in the payload.

mod builder;
mod classify;

pub use builder::{Bucket, BuiltStreams, CategoryCounts, EventSequence, Flow, Slot, StreamBuilder, TrackedSequence};
pub use classify::{classify, is_sentinel, Classification, EventKey, Group};
