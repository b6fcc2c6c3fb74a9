use std::{cmp::Reverse, fmt, str::FromStr};

use crate::api::Post;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Sort {
    /// Most recently created first
    #[default]
    New,

    /// Most upvoted first, newest first among equals
    Top,
}

pub trait SortExt {
    fn sort(&self, posts: &mut [Post]);
}

impl SortExt for Sort {
    fn sort(&self, posts: &mut [Post]) {
        match self {
            Sort::New => posts.sort_unstable_by_key(|p| Reverse((p.created_at, p.id))),
            Sort::Top => posts.sort_unstable_by_key(|p| {
                Reverse((p.upvotes.len(), p.created_at, p.id))
            }),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::New => write!(f, "new"),
            Sort::Top => write!(f, "top"),
        }
    }
}

impl FromStr for Sort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Sort> {
        match s {
            "new" => Ok(Sort::New),
            "top" => Ok(Sort::Top),
            _ => Err(anyhow::anyhow!("unknown sort {s:?}, expected `new` or `top`")),
        }
    }
}
