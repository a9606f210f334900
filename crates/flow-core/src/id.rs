use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for every id in a flow, for cheap comparison and hashing.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Shared counter so generated ids never collide across id kinds.
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing handle.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &'static str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique id with a prefix (e.g. `node_3`, `edge_7`).
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }

            /// `with_prefix`, drawing again while `taken` reports the id
            /// as already in use.
            pub fn unused_with_prefix(prefix: &str, taken: impl Fn(Self) -> bool) -> Self {
                loop {
                    let id = Self::with_prefix(prefix);
                    if !taken(id) {
                        return id;
                    }
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a node. Unique within a `FlowState`.
    NodeId
);

interned_id!(
    /// Identifier of an edge. Unique within a `FlowState`.
    EdgeId
);

interned_id!(
    /// Identifier of a port, unique only within its owning node.
    PortId
);

impl NodeId {
    /// The sentinel used as the target of an edge that is still being linked.
    pub fn empty() -> Self {
        Self::intern("")
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("start");
        let b = NodeId::intern("start");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "start");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EdgeId::with_prefix("edge");
        let b = EdgeId::with_prefix("edge");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("edge_"));
    }

    #[test]
    fn unused_ids_skip_taken_ones() {
        let next = EdgeId::with_prefix("wire");
        let n: u64 = next.as_str()["wire_".len()..].parse().unwrap();
        let taken: Vec<EdgeId> = (n + 1..n + 6)
            .map(|i| EdgeId::intern(&format!("wire_{i}")))
            .collect();
        let id = EdgeId::unused_with_prefix("wire", |id| taken.contains(&id));
        assert!(!taken.contains(&id));
        assert!(id.as_str().starts_with("wire_"));
    }

    #[test]
    fn empty_sentinel() {
        assert!(NodeId::empty().is_empty());
        assert!(!NodeId::intern("n").is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = PortId::intern("out");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"out\"");
        let back: PortId = serde_json::from_str("\"out\"").unwrap();
        assert_eq!(back, id);
    }
}
