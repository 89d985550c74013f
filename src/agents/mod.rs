mod config;
mod ddpg;

pub use config::DDPGConfig;
pub use ddpg::DDPG;


use {
    crate::components::ReplayBuffer,
    candle_core::{
        Device,
        Result,
        Tensor,
    },
};

/// A learning algorithm driven by an outer episode loop.
pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
        action_upper_bound: &[f64],
    ) -> Result<Box<Self>>;

    /// The action the current policy picks for a single (unbatched) state.
    ///
    /// Must not mutate any learner state, so it can be freely interleaved
    /// with training.
    fn get_next_action(
        &self,
        state: &Tensor,
    ) -> Result<Tensor>;

    /// Run one synchronous training step.
    fn train(&mut self) -> Result<()>;
}

/// An [`Algorithm`] that learns from past transitions via a replay buffer.
pub trait OffPolicyAlgorithm: Algorithm {
    fn save_transition(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
    );

    fn replay_buffer(&self) -> &ReplayBuffer;
}
