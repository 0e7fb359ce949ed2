//! SAI Data - data instances reached through an access grant
//!
//! `ActiveGrant` opens an access grant and keeps checking that the grantee's
//! registration still names it as current. From there:
//!
//! - `DataInstanceEnumerator` walks the instances one data grant covers,
//!   lazily and restartably
//! - `DataInstance` guards every read and write with the grant's modes
//! - `ActiveGrant::new_instance` and `new_child_instance` add instances and
//!   keep registrations and parent links in step

#![forbid(unsafe_code)]

/// Grant handles
pub mod active;

/// Instance enumeration
pub mod enumerator;

/// Mode-guarded instances
pub mod instance;

pub use active::ActiveGrant;
pub use enumerator::DataInstanceEnumerator;
pub use instance::{DataInstance, ParentLink};
