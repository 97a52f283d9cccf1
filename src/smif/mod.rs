//! SMIF device driver.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod controller;

pub mod hyperbus;

pub mod xip;

pub(crate) mod regs;
