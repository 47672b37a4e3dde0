use std::{fmt, hash::Hash, marker::PhantomData};

/// A u64-backed identifier handed out by a [`KeyGenerator`]
pub trait Key: Copy + Eq + Hash + fmt::Debug {
    fn to_u64(&self) -> u64;
    fn from_u64(value: u64) -> Self;
}

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl Key for $name {
            fn to_u64(&self) -> u64 {
                self.0
            }

            fn from_u64(value: u64) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_key!(
    /// One connected peer within a session
    ParticipantId,
    "participant"
);
define_key!(
    /// A replicated entity within a session's world
    EntityId,
    "entity"
);
define_key!(
    /// A session advertised on the network
    SessionId,
    "session"
);
define_key!(
    /// A puzzle hosted by the authority
    PuzzleId,
    "puzzle"
);

/// Hands out monotonically increasing keys, never reusing one
pub struct KeyGenerator<K: Key> {
    next: u64,
    phantom: PhantomData<K>,
}

impl<K: Key> KeyGenerator<K> {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: first,
            phantom: PhantomData,
        }
    }

    pub fn generate(&mut self) -> K {
        let key = K::from_u64(self.next);
        self.next += 1;
        key
    }
}

impl<K: Key> Default for KeyGenerator<K> {
    fn default() -> Self {
        Self::new()
    }
}
