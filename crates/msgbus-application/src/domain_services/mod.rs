//! Domain services shared by broker implementations

pub mod provisioner;

pub use provisioner::Provisioner;
