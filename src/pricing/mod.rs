//! Reference prices: closed-form European values and a finite-difference
//! American put.

pub mod american_fd;
pub mod black_scholes;
pub mod reference;

pub use american_fd::AmericanPutFd;
pub use black_scholes::{black_scholes_call, black_scholes_put, BlackScholesCallSurface};
pub use reference::ReferencePricer;
