use indexmap::IndexMap;
use std::hash::Hash;

use crate::config::ToolConfig;

pub trait Combine {
    /// Combine two values, preferring the values in `self`.
    ///
    /// The logic follows that of Cargo's `config.toml`:
    ///
    /// > If a key is specified in multiple config files, the values will get merged together.
    /// > Numbers, strings, and booleans will use the value in the deeper config directory taking
    /// > precedence over ancestor directories, where the home directory is the lowest priority.
    /// > Arrays will be joined together with higher precedence items being placed later in the
    /// > merged array.
    ///
    /// ...with one exception: fragment tables are merged by name, and the higher precedence
    /// definition of a fragment wins outright.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

macro_rules! impl_combine_or {
    ($name:ty) => {
        impl Combine for Option<$name> {
            fn combine(self, other: Option<$name>) -> Option<$name> {
                self.or(other)
            }
        }
    };
}

impl_combine_or!(ToolConfig);

impl<K, V> Combine for IndexMap<K, V>
where
    K: Eq + Hash,
{
    /// Keep every entry of `self` in its declared order, then append the entries of `other`
    /// whose keys `self` does not define.
    fn combine(mut self, other: IndexMap<K, V>) -> IndexMap<K, V> {
        for (key, value) in other {
            self.entry(key).or_insert(value);
        }
        self
    }
}
