//! Arguments shared by the `one.*pool.info` calls.
//!
//! Every user-owned pool takes the same `(filter, start, end)` triple. The
//! filter selects whose objects are listed; `start`/`end` bound the ID range,
//! with `-1` meaning "no bound".

use crate::error::{Error, Result};
use crate::rpc::Value;

/// Ownership filter of a pool query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolWho {
    /// Objects owned by the caller (`-3`)
    Mine,
    /// Every object the caller may see (`-2`)
    #[default]
    All,
    /// Objects owned by the caller and by its group (`-1`)
    MineAndGroup,
    /// Objects owned by a given user ID
    User(i32),
}

impl PoolWho {
    /// Wire value of the filter flag.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Mine => -3,
            Self::All => -2,
            Self::MineAndGroup => -1,
            Self::User(id) => id,
        }
    }

    /// Decode a filter flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for negative values other than -1..=-3.
    pub fn from_i32(flag: i32) -> Result<Self> {
        match flag {
            -3 => Ok(Self::Mine),
            -2 => Ok(Self::All),
            -1 => Ok(Self::MineAndGroup),
            id if id >= 0 => Ok(Self::User(id)),
            other => Err(Error::InvalidArgument(format!(
                "invalid pool filter flag: {other}"
            ))),
        }
    }
}

/// `(who, start, end)` arguments of a pool query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolFilter {
    /// Ownership filter
    pub who: PoolWho,
    /// First ID, or -1
    pub start: i32,
    /// Last ID, or -1
    pub end: i32,
}

impl Default for PoolFilter {
    fn default() -> Self {
        Self {
            who: PoolWho::All,
            start: -1,
            end: -1,
        }
    }
}

impl PoolFilter {
    /// Every visible object.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Objects matching `who`, unbounded.
    #[must_use]
    pub fn who(who: PoolWho) -> Self {
        Self {
            who,
            ..Self::default()
        }
    }

    /// Restrict to IDs in `start..=end`.
    #[must_use]
    pub const fn with_range(mut self, start: i32, end: i32) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Build a filter from the positional form used by scripts.
    ///
    /// Accepts no arguments (all objects), one argument (the filter flag) or
    /// three (flag, start, end).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for any other arity or a bad flag.
    pub fn from_args(args: &[i32]) -> Result<Self> {
        match *args {
            [] => Ok(Self::default()),
            [flag] => Ok(Self::who(PoolWho::from_i32(flag)?)),
            [flag, start, end] => Ok(Self::who(PoolWho::from_i32(flag)?).with_range(start, end)),
            _ => Err(Error::InvalidArgument(format!(
                "pool filter takes 0, 1 or 3 arguments, got {}",
                args.len()
            ))),
        }
    }

    /// Positional call arguments.
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.who.as_i32()),
            Value::Int(self.start),
            Value::Int(self.end),
        ]
    }
}
