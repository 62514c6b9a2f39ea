//! Value hydration.
//!
//! One codec per backend, each a `hydrate`/`dehydrate` pair converting
//! between runtime [`Value`](crate::value::Value)s and the backend-native
//! representation. `dehydrate(meta, hydrate(v)) = v` holds for every value
//! whose runtime kind matches the meta triple.
//!
//! The epoch unit differs by design: the CSV codec carries dates as
//! seconds-since-epoch, the SQL codec as milliseconds. Neither side ever
//! infers the unit from data.

pub mod csv;
pub mod sql;
