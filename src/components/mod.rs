//! # Components
//!
//! This module contains the components that can be used to build an agent.
//!
//! ## Noise
//!
//! The [`GaussianNoise`] struct perturbs actions with zero-mean Gaussian
//! noise under a multiplicative decay schedule. It is used by the episode
//! driver to explore, the [`crate::agents::DDPG`] policy itself being
//! deterministic.
//!
//! ## Replay Buffer
//!
//! The [`ReplayBuffer`] struct implements a fixed-capacity ring buffer of
//! transitions, which off-policy algorithms such as [`crate::agents::DDPG`]
//! sample batches from.

mod gaussian_noise;
mod replay_buffer;

pub use gaussian_noise::GaussianNoise;
pub use replay_buffer::ReplayBuffer;
