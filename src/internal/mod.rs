//! Internal implementation details.

pub(crate) mod dispose_bag;
pub(crate) mod once_map;

pub(crate) use dispose_bag::DisposeBag;
pub(crate) use once_map::OnceMap;
