mod pendulum;

pub use pendulum::{
    PendulumConfig,
    PendulumEnv,
};

use {
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
};

pub trait VectorConvertible {
    fn from_vec(value: Vec<f64>) -> Self;
    fn to_vec(value: Self) -> Vec<f64>;
}

pub trait TensorConvertible: VectorConvertible + Sized {
    fn from_tensor(value: Tensor) -> candle_core::Result<Self>;
    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor>;
}

impl VectorConvertible for Vec<f64> {
    fn from_vec(value: Vec<f64>) -> Self {
        value
    }
    fn to_vec(value: Self) -> Vec<f64> {
        value
    }
}

impl TensorConvertible for Vec<f64> {
    fn from_tensor(value: Tensor) -> candle_core::Result<Self> {
        value.to_vec1::<f64>()
    }
    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(value, device)
    }
}

#[derive(Debug)]
pub struct Step<O, A> {
    pub observation: O,
    pub action: A,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

pub trait Environment {
    type Config;
    type Action;
    type Observation;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;
    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation>;
    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>>;
    fn observation_space(&self) -> Vec<usize>;
    fn action_space(&self) -> Vec<usize>;
    fn action_upper_bound(&self) -> Vec<f64>;
    fn current_observation(&self) -> Self::Observation;
}
