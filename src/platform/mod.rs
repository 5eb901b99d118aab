// platform/mod.rs - Directory Facilitator (C2)
//
//! The DF is the one platform-level agent this system runs in-process
//! (§4.2). It is an "external collaborator" only in the sense that its
//! storage is trivial (§1); the register/deregister/search surface it
//! exposes is fully implemented here.

pub mod df;

pub use df::DirectoryFacilitator;
